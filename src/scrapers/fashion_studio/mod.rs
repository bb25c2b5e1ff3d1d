pub mod crawler;
pub mod parser;

pub use crawler::FashionStudioCrawler;
pub use parser::parse_products;
