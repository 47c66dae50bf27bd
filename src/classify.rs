//! Classification of dataset files: data files versus sidecar JSON descriptors.

/// Extension (matched case-insensitively) that marks a metadata descriptor.
pub const METADATA_EXTENSION: &str = "json";

/// Reserved name of the dataset-level descriptor. Its document attaches to
/// the folder that contains it rather than to any item.
pub const DATASET_DESCRIPTOR_NAME: &str = "dataset_description.json";

/// What role a file plays during the mirror pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// An ordinary data file, uploaded as an item.
    Data,
    /// A sidecar descriptor; parsed and attached as metadata to the data
    /// file sharing its base key, never uploaded itself.
    Descriptor,
    /// The dataset-level descriptor; attached to the containing folder.
    DatasetDescriptor,
}

/// Classify a filename. Pure: same input always yields the same kind.
pub fn classify(filename: &str) -> FileKind {
    if filename == DATASET_DESCRIPTOR_NAME {
        return FileKind::DatasetDescriptor;
    }
    match filename.rsplit_once('.') {
        Some((_, ext)) if ext.eq_ignore_ascii_case(METADATA_EXTENSION) => FileKind::Descriptor,
        _ => FileKind::Data,
    }
}

/// The association key between a data file and its descriptor: the filename
/// up to the first dot. BIDS data files carry compound extensions
/// ("bold.nii.gz") while their sidecars carry a single one ("bold.json"),
/// so stripping everything from the first dot pairs them. Association only
/// ever happens within a single directory listing.
pub fn base_key(filename: &str) -> &str {
    filename.split_once('.').map_or(filename, |(stem, _)| stem)
}
