pub mod error;
pub mod links;
pub mod retry;
pub mod services;
pub mod store;
pub mod traits;
pub mod wikiplots;
pub mod works;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{ErrorKind, ResolveError, Result};
pub use retry::RetryPolicy;
pub use services::bookshelf::{parse_book_page, BookshelfScraper, ScrapedBook};
pub use services::catalog::{CatalogRecord, CatalogResolver};
pub use services::knowledge_graph::{KnowledgeGraphResolver, VerifiedHit, PLOT_SECTIONS};
pub use services::page::{renderer_from_config, BrowserlessPageRenderer, ChromePageRenderer};
pub use store::{BlobStore, Cache, Caches};
pub use traits::{KnowledgeGraph, MovieCatalog, PageRenderer};
pub use wikiplots::WikiPlots;
pub use works::{IsbnPair, Work, WorkIndex, WorkKey};
