// Resolvers for the three external id spaces plus the page renderers the book
// scraper uses. Each resolver owns its cache namespace and retry policy.

pub mod bookshelf;
pub mod catalog;
pub mod knowledge_graph;
pub mod page;
