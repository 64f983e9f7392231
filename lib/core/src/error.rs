//! Error handling foundation for pagecraft.
//!
//! Only the `Result` alias lives here. Each crate defines its own domain
//! error enums and returns them wrapped in a rootcause `Report` wherever an
//! error crosses a layer boundary (persistence, execution).

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_type_works() {
        let ok: Result<i32> = Ok(42);
        assert_eq!(ok.expect("should be ok"), 42);
    }
}
