//! Validators available to fields, importable from a single path.

pub use crate::schema::validators::{
    BoxedValidator, ContainsNoneOf, ContainsOnly, Email, Equal, FileSize, FileType, Length,
    NoneOf, OneOf, Predicate, Range, Regexp, Url, Validator, GB, GIB, KB, KIB, MB, MIB,
};
