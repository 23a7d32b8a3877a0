//! Category folders and the extension policy that maps uploads onto them.

use std::collections::BTreeMap;

/// Destination folder for an accepted upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Pdf,
    Doc,
    Image,
}

impl Category {
    /// Every category, in the order folders are created at startup.
    pub const ALL: [Category; 3] = [Category::Pdf, Category::Doc, Category::Image];

    /// Folder name beneath the upload root.
    pub fn folder(self) -> &'static str {
        match self {
            Category::Pdf => "pdf",
            Category::Doc => "doc",
            Category::Image => "image",
        }
    }
}

/// Which extensions are accepted and where each one is stored.
///
/// The allow-list is exactly the set of mapped extensions; there is no
/// separate list to keep in sync. Keys are stored lowercase.
#[derive(Clone, Debug)]
pub struct UploadPolicy {
    extensions: BTreeMap<String, Category>,
    display_order: Vec<String>,
}

impl UploadPolicy {
    /// Build a policy from `(extension, category)` pairs. Extensions are
    /// matched case-insensitively.
    pub fn new<I, S>(mapping: I) -> Self
    where
        I: IntoIterator<Item = (S, Category)>,
        S: AsRef<str>,
    {
        let mut extensions = BTreeMap::new();
        let mut display_order = Vec::new();
        for (ext, category) in mapping {
            let ext = ext.as_ref().trim_start_matches('.').to_ascii_lowercase();
            if extensions.insert(ext.clone(), category).is_none() {
                display_order.push(ext);
            }
        }
        Self {
            extensions,
            display_order,
        }
    }

    /// Category for an extension, or `None` when it is not allowed.
    pub fn category_for(&self, extension: &str) -> Option<Category> {
        self.extensions
            .get(&extension.to_ascii_lowercase())
            .copied()
    }

    pub fn is_allowed(&self, extension: &str) -> bool {
        self.category_for(extension).is_some()
    }

    /// Allowed extensions in declaration order, e.g. `pdf, docx, jpg`.
    pub fn describe(&self) -> String {
        self.display_order.join(", ")
    }

    /// Value for the form's `accept` attribute, e.g. `.pdf,.docx,.jpg`.
    pub fn accept_attr(&self) -> String {
        self.display_order
            .iter()
            .map(|ext| format!(".{}", ext))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new([
            ("pdf", Category::Pdf),
            ("docx", Category::Doc),
            ("jpg", Category::Image),
            ("jpeg", Category::Image),
            ("png", Category::Image),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_maps_extensions_to_folders() {
        let policy = UploadPolicy::default();
        assert_eq!(policy.category_for("pdf"), Some(Category::Pdf));
        assert_eq!(policy.category_for("docx"), Some(Category::Doc));
        assert_eq!(policy.category_for("jpg"), Some(Category::Image));
        assert_eq!(policy.category_for("jpeg"), Some(Category::Image));
        assert_eq!(policy.category_for("png"), Some(Category::Image));
        assert_eq!(policy.category_for("PnG"), Some(Category::Image));
    }

    #[test]
    fn unmapped_extensions_are_rejected() {
        let policy = UploadPolicy::default();
        for ext in ["zip", "doc", "exe", "", "pdf ", "gif"] {
            assert!(!policy.is_allowed(ext), "{ext:?} should not be allowed");
        }
    }

    #[test]
    fn describe_keeps_declaration_order() {
        let policy = UploadPolicy::default();
        assert_eq!(policy.describe(), "pdf, docx, jpg, jpeg, png");
        assert_eq!(policy.accept_attr(), ".pdf,.docx,.jpg,.jpeg,.png");
    }

    #[test]
    fn custom_policy_normalizes_keys() {
        let policy = UploadPolicy::new([(".TXT", Category::Doc), ("txt", Category::Doc)]);
        assert_eq!(policy.category_for("txt"), Some(Category::Doc));
        assert_eq!(policy.describe(), "txt");
    }

    #[test]
    fn folder_names() {
        let folders: Vec<_> = Category::ALL.iter().map(|c| c.folder()).collect();
        assert_eq!(folders, ["pdf", "doc", "image"]);
    }
}
