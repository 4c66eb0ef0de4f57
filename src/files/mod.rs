mod picker;
mod registry;
mod size;

pub use picker::{batch_from_folder, batch_from_paths};
pub use registry::{BatchRejection, FileEntry, FileRegistry, MAX_FILE_SIZE_BYTES};
pub use size::format_size;
