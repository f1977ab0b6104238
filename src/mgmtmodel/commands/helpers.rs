use crate::error::Result;
use crate::expression::ExpressionResolver;
use crate::marshal::{read_document, write_document};
use crate::model::ConfigTree;
use crate::resources::ResourceRegistry;
use crate::store::DocumentStore;

/// Load the stored document, or an empty tree if there is none.
pub fn load_tree<S: DocumentStore>(
    store: &S,
    registry: &ResourceRegistry,
    resolver: &dyn ExpressionResolver,
) -> Result<ConfigTree> {
    match store.load()? {
        Some(xml) => read_document(&xml, registry, resolver),
        None => Ok(ConfigTree::new()),
    }
}

pub fn persist<S: DocumentStore>(
    store: &mut S,
    tree: &ConfigTree,
    registry: &ResourceRegistry,
) -> Result<()> {
    let xml = write_document(tree, registry)?;
    store.save(&xml)
}
