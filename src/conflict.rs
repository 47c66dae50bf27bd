//! Per-file conflict resolution between the local walk and existing remote items.

/// Run-wide policy for handling items that already exist at the destination.
/// Fixed for the duration of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPolicy {
    /// Empty the destination folder before mirroring starts.
    ResetDatabase,
    /// Fail the whole run on the first name collision.
    ErrorOnSameName,
    /// Leave existing items (content and metadata) untouched.
    SkipOnSameName,
    /// Reuse the existing item id and replace its content.
    OverwriteOnSameName,
}

/// What the engine should do with one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Skip,
    Overwrite,
    Abort,
}

/// Decide the action for one file given the existing-item lookup result and
/// the configured policy.
///
/// `ResetDatabase` behaves as plain creation: the destination was emptied
/// before the walk, so an item that still exists points at an incomplete
/// reset, not at a data decision.
pub fn decide(existing: Option<&str>, policy: ImportPolicy) -> Action {
    match existing {
        None => Action::Create,
        Some(_) => match policy {
            ImportPolicy::ErrorOnSameName => Action::Abort,
            ImportPolicy::SkipOnSameName => Action::Skip,
            ImportPolicy::OverwriteOnSameName => Action::Overwrite,
            ImportPolicy::ResetDatabase => Action::Create,
        },
    }
}
