use thiserror::Error;

use variant::types::VariantRef;

use crate::model::ItemId;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("item {0} does not exist")]
    NonexistentItem(ItemId),

    #[error("variant {0} is not in the catalog")]
    UnknownVariant(VariantRef),

    #[error("store touched {persisted} items, registry holds {in_memory}")]
    OutOfSync { persisted: u64, in_memory: usize },
}
