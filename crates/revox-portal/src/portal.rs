//! Account portal session
//!
//! Implements [`LoginSession`] by driving the portal's sign-in, two-factor
//! and subscriptions pages through a [`WebDriverClient`].

use crate::webdriver::{firefox_capabilities, Browser, WebDriverClient, WebDriverError};
use async_trait::async_trait;
use revox_core::{
    ActivationCount, LoginOutcome, LoginSession, RevoxConfig, Secret, SessionError,
    VerificationCode,
};

/// CSS selectors of the portal markup
pub mod selectors {
    /// Sign-in email field
    pub const EMAIL_INPUT: &str = "#conversations_create_session_form_email";
    /// Sign-in password field
    pub const PASSWORD_INPUT: &str = "#conversations_create_session_form_password";
    /// Submit button on sign-in and two-factor forms
    pub const SUBMIT_BUTTON: &str = "input.btn.bg-gr";
    /// Two-factor code field
    pub const TWO_FACTOR_INPUT: &str = "#conversations_email_tfa_required_form_code";
    /// Error banner
    pub const ERROR_BANNER: &str = "div.error-msg";
    /// Activations status label, e.g. "Total 3, of 5 seats"
    pub const ACTIVATIONS_LABEL: &str = "span.left.pt5.ml20";
    /// Revoke-all button on the subscriptions page
    pub const REVOKE_BUTTON: &str = "input.btn.s.outlined.mr15.mb15.right";
}

/// What the page showed after submitting credentials
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoginPage {
    /// Two-factor code field present
    pub two_factor_field: bool,
    /// Error banner present
    pub error_banner: bool,
    /// Sign-in form still present
    pub sign_in_form: bool,
}

impl LoginPage {
    /// Classify the page
    ///
    /// A page still showing the sign-in form without an explanation is
    /// unclassifiable and counts as a failure.
    #[must_use]
    pub fn classify(self) -> LoginOutcome {
        if self.two_factor_field {
            LoginOutcome::TwoFactorRequired
        } else if self.error_banner || self.sign_in_form {
            LoginOutcome::Failure
        } else {
            LoginOutcome::Success
        }
    }
}

/// Browser session on the account portal
#[derive(Debug)]
pub struct PortalSession<B = WebDriverClient> {
    browser: B,
    base_url: String,
    licenses_url: String,
    login: String,
    password: Secret,
}

impl PortalSession<WebDriverClient> {
    /// Open a browser session for the configured account
    ///
    /// # Errors
    /// Driver unreachable or session refused.
    pub async fn open(config: &RevoxConfig) -> Result<Self, SessionError> {
        let portal = &config.portal;
        let client =
            WebDriverClient::connect(&portal.webdriver_url, firefox_capabilities(portal.headless))
                .await?;
        client.set_implicit_wait(portal.implicit_wait()).await?;

        Ok(Self::with_browser(client, config))
    }
}

impl<B: Browser> PortalSession<B> {
    /// Drive the portal through an already connected browser
    #[must_use]
    pub fn with_browser(browser: B, config: &RevoxConfig) -> Self {
        Self {
            browser,
            base_url: config.portal.base_url.clone(),
            licenses_url: config.portal.licenses_url.clone(),
            login: config.unity.login.clone(),
            password: config.unity.password.clone(),
        }
    }

    /// Underlying browser
    #[inline]
    #[must_use]
    pub fn browser(&self) -> &B {
        &self.browser
    }

    /// End the browser session
    ///
    /// # Errors
    /// Driver command failure.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        self.browser.close().await.map_err(SessionError::from)
    }

    /// Land on the sign-in page with no session from an earlier attempt
    async fn open_sign_in(&self) -> Result<(), WebDriverError> {
        self.browser.navigate(&self.base_url).await?;
        if self
            .browser
            .find_optional(selectors::EMAIL_INPUT)
            .await?
            .is_none()
        {
            tracing::info!("Still signed in from an earlier attempt, dropping cookies");
            self.browser.delete_cookies().await?;
            self.browser.navigate(&self.base_url).await?;
        }
        self.log_page("login").await
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), WebDriverError> {
        let field = self.browser.find(selector).await?;
        self.browser.clear(&field).await?;
        self.browser.send_keys(&field, text).await
    }

    async fn log_page(&self, step: &'static str) -> Result<(), WebDriverError> {
        let url = self.browser.current_url().await?;
        let title = self.browser.title().await?;
        tracing::info!(step, url = %url, title = %title, "Page loaded");
        Ok(())
    }
}

#[async_trait]
impl<B: Browser + 'static> LoginSession for PortalSession<B> {
    async fn login(&mut self) -> Result<LoginOutcome, SessionError> {
        self.open_sign_in().await?;

        self.fill(selectors::EMAIL_INPUT, &self.login).await?;
        self.fill(selectors::PASSWORD_INPUT, self.password.expose())
            .await?;
        let submit = self.browser.find(selectors::SUBMIT_BUTTON).await?;
        self.browser.click(&submit).await?;

        let page = LoginPage {
            two_factor_field: self
                .browser
                .find_optional(selectors::TWO_FACTOR_INPUT)
                .await?
                .is_some(),
            error_banner: self
                .browser
                .find_optional(selectors::ERROR_BANNER)
                .await?
                .is_some(),
            sign_in_form: self
                .browser
                .find_optional(selectors::PASSWORD_INPUT)
                .await?
                .is_some(),
        };

        let outcome = page.classify();
        match outcome {
            LoginOutcome::TwoFactorRequired => tracing::info!("Verification required"),
            LoginOutcome::Failure => tracing::info!(?page, "Authorization failure"),
            LoginOutcome::Success => {}
        }
        Ok(outcome)
    }

    async fn apply_two_factor(&mut self, code: &VerificationCode) -> Result<bool, SessionError> {
        tracing::debug!(code = %code, "Applying verification code");

        self.fill(selectors::TWO_FACTOR_INPUT, code.as_str()).await?;
        let submit = self.browser.find(selectors::SUBMIT_BUTTON).await?;
        self.browser.click(&submit).await?;

        let rejected = match self.browser.find_optional(selectors::ERROR_BANNER).await? {
            Some(banner) => self.browser.is_displayed(&banner).await?,
            None => false,
        };
        Ok(!rejected)
    }

    async fn count(&mut self) -> Result<ActivationCount, SessionError> {
        self.browser.navigate(&self.licenses_url).await?;
        self.log_page("count").await?;

        match self
            .browser
            .find_optional(selectors::ACTIVATIONS_LABEL)
            .await?
        {
            Some(label) => {
                let text = self.browser.text(&label).await?;
                Ok(ActivationCount::parse_label(&text))
            }
            None => Ok(ActivationCount::ZERO),
        }
    }

    async fn revoke_all(&mut self) -> Result<(), SessionError> {
        let button = self.browser.find(selectors::REVOKE_BUTTON).await?;
        self.browser.click(&button).await?;
        Ok(())
    }
}
