//! Library tree entities: layout images, versions, and folders.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Classification of a layout image, driving its storage sub-path.
///
/// The numeric codes are part of the external contract (1 = Logo,
/// 2 = Banner, 3 = Version). Unmapped codes are rejected at construction
/// time instead of yielding an undefined storage location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageGroup {
    Logo,
    Banner,
    Version,
}

impl ImageGroup {
    /// Storage sub-path for this group, relative to the storage root.
    pub fn storage_prefix(self) -> &'static str {
        match self {
            ImageGroup::Logo => "images/logos",
            ImageGroup::Banner => "images/banners",
            ImageGroup::Version => "images/libversions",
        }
    }

    /// Numeric wire code of this group.
    pub fn code(self) -> i64 {
        match self {
            ImageGroup::Logo => 1,
            ImageGroup::Banner => 2,
            ImageGroup::Version => 3,
        }
    }

    /// Resolve a wire code. Unknown codes return `None`; callers turn that
    /// into a construction-time error.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ImageGroup::Logo),
            2 => Some(ImageGroup::Banner),
            3 => Some(ImageGroup::Version),
            _ => None,
        }
    }
}

/// A classified decorative image used on library tree nodes.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct LibLayoutImage {
    pub id: i64,

    /// Basename of the stored file under the group's sub-path.
    pub file_name: String,

    /// Numeric group code, see [`ImageGroup`].
    pub image_group: i64,
}

/// A named release grouping of library folders.
///
/// Deleting a version cascades deletion of its folders; deleting the
/// referenced banner image only clears the reference.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct LibraryVersion {
    pub id: i64,
    pub library_name: String,
    pub version_number: String,
    pub banner_image_id: Option<i64>,
}

/// A tree node under a library version.
///
/// `parent_id` forms a tree rooted at folders with no parent. Cycles are
/// rejected on reparenting with an explicit ancestor walk since the
/// persistence layer does not guarantee acyclicity.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct LibraryFolder {
    pub id: i64,
    pub folder_name: String,
    pub banner_image_id: Option<i64>,
    pub logo_image_id: Option<i64>,
    pub version_id: i64,
    pub parent_id: Option<i64>,
}
