//! Page interaction boundary.
//!
//! This module contains everything the core knows about a page:
//!
//! - [`Locator`] - tagged element-location strategies
//! - [`SelectorBook`] - ordered candidate chains per wizard target
//! - [`PageDriver`] - the abstract remote-browser capability set
//! - [`RemoteWebDriver`] - W3C wire-protocol implementation

mod driver;
mod locator;
mod selectors;
mod webdriver;

#[cfg(test)]
pub(crate) mod scripted;

pub use driver::{ElementRef, PageDriver, ResponseRecord};
pub use locator::{Locator, WireSelector};
pub use selectors::SelectorBook;
pub use webdriver::RemoteWebDriver;
