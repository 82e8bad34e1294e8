//! Storefront extraction pipeline.
//!
//! [`Scraper`] drives one run: read the product feed, fetch the
//! homepage, then walk the classified navigation links for policies,
//! FAQs and brand narrative. Every stage degrades independently, so a
//! partially broken storefront still produces a partial record rather
//! than an error.

pub mod catalog;
pub mod contact;
pub mod content;
pub mod faq;
pub mod fetch;
pub mod hero;
pub mod links;
pub mod model;
pub mod scrape;

pub use faq::{FaqExtractor, FaqStrategy};
pub use fetch::Fetcher;
pub use model::OpenAiCompatModel;
pub use scrape::{ScrapeConfig, Scraper};
