//! Collaborator implementations for webmind.
//!
//! The memory core only sees the capability traits from `webmind-core`;
//! these are the network-backed versions the CLI wires in:
//!
//! - [`HttpClient`]: raw GET (`HttpCapability`) and page text (`BrowseCapability`)
//! - [`DuckDuckGoSearch`]: web search (`SearchCapability`)

pub mod html;
pub mod http;
pub mod search;

pub use http::HttpClient;
pub use search::DuckDuckGoSearch;
