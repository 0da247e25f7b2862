//! Item source for PaperAtlas: reads the scraper's paper export and
//! derives the enrichable item sets (papers and key authors).

pub mod authors;
pub mod papers;

pub use authors::{analyze_authors, author_items, key_authors, parse_authors};
pub use papers::{load_papers, paper_items};
