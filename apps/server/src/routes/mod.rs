pub mod health;
pub mod refresh;

macros_utils::routes! {
    module health,
    module refresh,
}
