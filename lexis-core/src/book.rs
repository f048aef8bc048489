// Book identifiers and book page addresses

use crate::error::{CoreError, Result};
use url::Url;

pub const DEFAULT_BOOK_PAGE: &str = "https://gongjushu.cnki.net/rbook/bookdetail";

/// Query parameter of the book page that carries the id.
const BOOK_ID_PARAM: &str = "bookid";

/// A book to extract, as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRef {
    pub id: String,
    /// The detail page the id came from, if the user gave a URL.
    pub page_url: Option<String>,
}

impl BookRef {
    pub fn from_id(id: &str) -> Self {
        Self {
            id: id.to_string(),
            page_url: None,
        }
    }

    /// Detail page to read the title from: the given URL, or one built on `page_base`.
    pub fn page_url(&self, page_base: &str) -> Result<String> {
        match self.page_url {
            Some(ref url) => Ok(url.clone()),
            None => book_page_url(page_base, &self.id),
        }
    }
}

/// `R` followed by one or more ASCII digits, nothing else.
pub fn is_book_id(value: &str) -> bool {
    value
        .strip_prefix('R')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// The `R<digits>` prefix of `value`, if it starts with one.
fn leading_book_id(value: &str) -> Option<String> {
    let digits = value.strip_prefix('R')?;
    let len = digits.bytes().take_while(|b| b.is_ascii_digit()).count();
    if len == 0 {
        return None;
    }
    Some(format!("R{}", &digits[..len]))
}

/// Pull the book id out of a book page URL's `bookid` query parameter.
pub fn book_id_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .filter(|(key, _)| key == BOOK_ID_PARAM)
        .find_map(|(_, value)| leading_book_id(&value))
}

/// Accept either a bare id or a book page URL.
pub fn resolve_book(input: &str) -> Result<BookRef> {
    let input = input.trim();

    if is_book_id(input) {
        return Ok(BookRef::from_id(input));
    }

    match book_id_from_url(input) {
        Some(id) => Ok(BookRef {
            id,
            page_url: Some(input.to_string()),
        }),
        None => Err(CoreError::InvalidBook(input.to_string())),
    }
}

/// `{page_base}?bookid={id}`
pub fn book_page_url(page_base: &str, id: &str) -> Result<String> {
    let mut url = Url::parse(page_base)
        .map_err(|e| CoreError::InvalidBook(format!("{} ({})", page_base, e)))?;
    url.query_pairs_mut().append_pair(BOOK_ID_PARAM, id);
    Ok(url.to_string())
}
