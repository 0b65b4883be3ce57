//! Crawl progress tracking
//!
//! `PageState` names every stage a URL moves through between discovery
//! and its terminal outcome. The coordinator records transitions in the
//! resume database so an interrupted run can tell finished work from
//! in-flight work.

mod page_state;

pub use page_state::PageState;
