use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::element::{CategoryId, Element, ElementId};
use crate::error::CoreError;

/// One captured version of a model: elements ordered by id plus derived indexes.
#[derive(Debug, Clone)]
pub struct Snapshot {
    source: String,
    elements: Vec<Element>,
    index: HashMap<ElementId, usize>,
    by_category: BTreeMap<Option<CategoryId>, Vec<ElementId>>,
    category_names: BTreeMap<CategoryId, String>,
}

// ---------------------------------------------------------------------------
// JSON shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    source: String,
    #[serde(default)]
    categories: Vec<CategoryEntry>,
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct CategoryEntry {
    id: CategoryId,
    name: String,
}

impl Snapshot {
    /// Build a snapshot. Elements are re-ordered by id; duplicate ids are rejected.
    pub fn new(source: impl Into<String>, mut elements: Vec<Element>) -> Result<Self, CoreError> {
        let source = source.into();
        elements.sort_by_key(|e| e.id);

        let mut index = HashMap::with_capacity(elements.len());
        let mut by_category: BTreeMap<Option<CategoryId>, Vec<ElementId>> = BTreeMap::new();
        for (i, e) in elements.iter().enumerate() {
            if index.insert(e.id, i).is_some() {
                return Err(CoreError::DuplicateId { source, id: e.id });
            }
            by_category.entry(e.category).or_default().push(e.id);
        }

        Ok(Self {
            source,
            elements,
            index,
            by_category,
            category_names: BTreeMap::new(),
        })
    }

    pub fn with_category_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = (CategoryId, S)>,
        S: Into<String>,
    {
        self.category_names
            .extend(names.into_iter().map(|(id, name)| (id, name.into())));
        self
    }

    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let file: SnapshotFile =
            serde_json::from_str(json).map_err(|e| CoreError::Parse(e.to_string()))?;
        let names = file.categories.into_iter().map(|c| (c.id, c.name));
        Ok(Self::new(file.source, file.elements)?.with_category_names(names))
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json(&data)
    }

    /// Identifier of the document this snapshot was captured from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Elements in ascending id order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.index.get(&id).map(|&i| &self.elements[i])
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements.iter().map(|e| e.id)
    }

    /// Categories present in this snapshot (`None` = uncategorized), ascending.
    pub fn categories(&self) -> impl Iterator<Item = Option<CategoryId>> + '_ {
        self.by_category.keys().copied()
    }

    /// Ids of the elements in `category`, ascending.
    pub fn ids_in_category(&self, category: Option<CategoryId>) -> &[ElementId] {
        self.by_category
            .get(&category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn category_name(&self, category: CategoryId) -> Option<&str> {
        self.category_names.get(&category).map(|s| s.as_str())
    }
}
