//! Finalizer and pause helpers shared by both reconcilers.

use kube::api::ObjectMeta;
use kube::Resource;
use serde_json::json;

use crate::constants::PAUSED_ANNOTATION;
use crate::scope::ObjectPatcher;

#[must_use]
pub fn has_finalizer(meta: &ObjectMeta, finalizer: &str) -> bool {
    meta.finalizers
        .as_ref()
        .is_some_and(|finalizers| finalizers.iter().any(|f| f == finalizer))
}

/// An object is paused while it carries the paused annotation, whatever its value.
#[must_use]
pub fn is_paused(meta: &ObjectMeta) -> bool {
    meta.annotations
        .as_ref()
        .is_some_and(|annotations| annotations.contains_key(PAUSED_ANNOTATION))
}

/// Append `finalizer` to the object, locally and on the server.
///
/// # Errors
///
/// Returns the failed patch.
pub async fn add_finalizer<K>(
    patcher: &dyn ObjectPatcher<K>,
    object: &mut K,
    finalizer: &str,
) -> Result<(), kube::Error>
where
    K: Resource + Send + Sync,
{
    if has_finalizer(object.meta(), finalizer) {
        return Ok(());
    }
    let finalizers = object.meta_mut().finalizers.get_or_insert_with(Vec::new);
    finalizers.push(finalizer.to_string());
    let body = json!({ "finalizers": finalizers.clone() });
    patcher.patch_metadata(object, body).await
}

/// Drop `finalizer` from the object, locally and on the server.
///
/// # Errors
///
/// Returns the failed patch.
pub async fn remove_finalizer<K>(
    patcher: &dyn ObjectPatcher<K>,
    object: &mut K,
    finalizer: &str,
) -> Result<(), kube::Error>
where
    K: Resource + Send + Sync,
{
    if !has_finalizer(object.meta(), finalizer) {
        return Ok(());
    }
    let finalizers = object.meta_mut().finalizers.get_or_insert_with(Vec::new);
    finalizers.retain(|f| f != finalizer);
    let body = json!({ "finalizers": finalizers.clone() });
    patcher.patch_metadata(object, body).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_has_finalizer() {
        let meta = ObjectMeta {
            finalizers: Some(vec!["a".to_string(), "b".to_string()]),
            ..ObjectMeta::default()
        };
        assert!(has_finalizer(&meta, "b"));
        assert!(!has_finalizer(&meta, "c"));
        assert!(!has_finalizer(&ObjectMeta::default(), "a"));
    }

    #[test]
    fn test_paused_annotation_value_is_ignored() {
        let meta = ObjectMeta {
            annotations: Some(BTreeMap::from([(
                PAUSED_ANNOTATION.to_string(),
                String::new(),
            )])),
            ..ObjectMeta::default()
        };
        assert!(is_paused(&meta));
        assert!(!is_paused(&ObjectMeta::default()));
    }
}
