//! Revox Portal - browser-driven login session
//!
//! Talks W3C WebDriver over HTTP to a Firefox driver and implements
//! [`revox_core::LoginSession`] for the account portal:
//! - Sign-in with outcome classification
//! - Two-factor code submission
//! - Activation count and revoke
//!
//! The driver can be an already running endpoint or a `geckodriver`
//! launched by [`DriverProcess`].

#![warn(unreachable_pub)]

pub mod driver;
pub mod portal;
pub mod webdriver;

pub use driver::DriverProcess;
pub use portal::{selectors, LoginPage, PortalSession};
pub use webdriver::{firefox_capabilities, Browser, ElementRef, WebDriverClient, WebDriverError};
