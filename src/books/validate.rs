use crate::books::model::Book;

/// 10 or 13 digits, hyphens allowed anywhere.
pub fn is_valid_isbn(isbn: &str) -> bool {
    if isbn.is_empty() || !isbn.chars().all(|c| c.is_ascii_digit() || c == '-') {
        return false;
    }
    let digits = isbn.chars().filter(|c| c.is_ascii_digit()).count();
    digits == 10 || digits == 13
}

fn has_two_decimal_precision(price: f64) -> bool {
    let cents = price * 100.0;
    (cents - cents.round()).abs() < 1e-6
}

/// Full-record validation, applied to new books and to merged records
/// on update. All violations are reported together.
pub fn validate_book(book: &Book) -> Vec<String> {
    let mut messages = Vec::new();

    let title_len = book.title.chars().count();
    if !(1..=100).contains(&title_len) {
        messages.push("title length must be between 1 and 100 characters".to_string());
    }
    let author_len = book.author.chars().count();
    if !(3..=50).contains(&author_len) {
        messages.push("author length must be between 3 and 50 characters".to_string());
    }
    if book.price <= 0.0 || !has_two_decimal_precision(book.price) {
        messages
            .push("price must be a positive number with at most 2 decimal places".to_string());
    }
    if !(1..=10_000).contains(&book.pages) {
        messages.push("pages must be between 1 and 10000".to_string());
    }
    let publisher_len = book.publisher.chars().count();
    if !(1..=100).contains(&publisher_len) {
        messages.push("publisher length must be between 1 and 100 characters".to_string());
    }
    let description_len = book.description.chars().count();
    if !(100..=500).contains(&description_len) {
        messages.push("description length must be between 100 and 500 characters".to_string());
    }
    if !is_valid_isbn(&book.isbn) {
        messages.push("isbn must be valid ISBN-10 or ISBN-13".to_string());
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;
    use uuid::Uuid;

    fn valid_book() -> Book {
        Book {
            id: Uuid::new_v4(),
            title: "A Title".into(),
            author: "An Author".into(),
            price: 12.50,
            date_published: date!(2020 - 01 - 15),
            pages: 200,
            publisher: "A Publisher".into(),
            description: "d".repeat(150),
            isbn: "0-306-40615-2".into(),
            user: None,
        }
    }

    #[test]
    fn valid_book_passes() {
        assert!(validate_book(&valid_book()).is_empty());
    }

    #[test]
    fn isbn_accepts_10_and_13_digits_with_hyphens() {
        assert!(is_valid_isbn("0306406152"));
        assert!(is_valid_isbn("0-306-40615-2"));
        assert!(is_valid_isbn("9783161484100"));
        assert!(is_valid_isbn("978-3-16-148410-0"));

        assert!(!is_valid_isbn(""));
        assert!(!is_valid_isbn("12345"));
        assert!(!is_valid_isbn("123456789012"));
        assert!(!is_valid_isbn("0-306-40615-X"));
        assert!(!is_valid_isbn("978 3161484100"));
    }

    #[test]
    fn price_must_be_positive_with_two_decimals() {
        let mut book = valid_book();
        book.price = 0.0;
        assert!(!validate_book(&book).is_empty());
        book.price = -5.0;
        assert!(!validate_book(&book).is_empty());
        book.price = 9.999;
        assert!(!validate_book(&book).is_empty());
        book.price = 9.99;
        assert!(validate_book(&book).is_empty());
        book.price = 10.0;
        assert!(validate_book(&book).is_empty());
    }

    #[test]
    fn description_and_pages_bounds() {
        let mut book = valid_book();
        book.description = "short".into();
        book.pages = 0;
        let messages = validate_book(&book);
        assert_eq!(messages.len(), 2);

        book.description = "d".repeat(501);
        book.pages = 10_001;
        assert_eq!(validate_book(&book).len(), 2);

        book.description = "d".repeat(100);
        book.pages = 10_000;
        assert!(validate_book(&book).is_empty());
    }
}
