//! Integration tests for the shortgen generation pipeline

mod composition;
mod dynamic_expansion;
mod registry_lifecycle;
mod test_utils;
