pub mod calendar;
pub mod feed;
pub mod page_quote;
pub mod series;
