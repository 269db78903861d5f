
/// CRUD operations tests for compose entities
pub mod crud_tests;


/// Positive i64 unlikely to collide between test runs.
pub(crate) fn fresh_id() -> i64 {
    ((uuid::Uuid::new_v4().as_u128() >> 65) as i64).max(1)
}
