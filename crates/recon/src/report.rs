//! Human-readable descriptions of reconciliation results.

use modeldiff_core::{Element, ElementId, Location, Snapshot, Storage};
use serde::Serialize;

use crate::category::category_display_name;
use crate::config::ReportConfig;
use crate::error::ReconError;
use crate::model::{ChangeType, ReconciliationResult, Side};

const PARTITION_SEPARATOR: &str = " | ";
const NO_CATEGORY: &str = "Null";

/// One line of the result listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub number: usize,
    pub id: ElementId,
    pub name: String,
    pub category: String,
    pub change: ChangeType,
}

pub struct Report<'a> {
    old: &'a Snapshot,
    new: &'a Snapshot,
    result: &'a ReconciliationResult,
    separator: String,
    include_unchanged: bool,
}

impl<'a> Report<'a> {
    pub fn new(old: &'a Snapshot, new: &'a Snapshot, result: &'a ReconciliationResult) -> Self {
        Self {
            old,
            new,
            result,
            separator: "\n".into(),
            include_unchanged: true,
        }
    }

    /// Report using the `[report]` section's separator and unchanged-field policy.
    pub fn from_config(
        old: &'a Snapshot,
        new: &'a Snapshot,
        result: &'a ReconciliationResult,
        config: &ReportConfig,
    ) -> Self {
        Self {
            include_unchanged: config.include_unchanged,
            ..Self::new(old, new, result).with_separator(config.separator.as_str())
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Field-by-field description of one element. Modified elements list
    /// `before -> after` for each differing field; other change types read
    /// the element from the snapshot it lives in.
    pub fn describe_element(
        &self,
        id: ElementId,
        change: ChangeType,
        include_unchanged: bool,
    ) -> Result<String, ReconError> {
        self.describe_with(id, change, include_unchanged, &self.separator)
    }

    /// [`Report::describe_element`] with the configured `include_unchanged`.
    pub fn describe(&self, id: ElementId, change: ChangeType) -> Result<String, ReconError> {
        self.describe_element(id, change, self.include_unchanged)
    }

    /// Header plus a one-line description per id, changed fields only.
    pub fn describe_partition(
        &self,
        ids: &[ElementId],
        change: ChangeType,
    ) -> Result<String, ReconError> {
        let mut out = format!("{} elements are {change}\n", ids.len());
        for &id in ids {
            out.push('\n');
            out.push_str(&self.describe_with(id, change, false, PARTITION_SEPARATOR)?);
        }
        Ok(out)
    }

    /// Numbered listing of `ids`, ordered by change rank and then id.
    pub fn rows(&self, ids: &[ElementId]) -> Result<Vec<ResultRow>, ReconError> {
        let mut rows = ids
            .iter()
            .map(|&id| {
                let change = self
                    .result
                    .change_of(id)
                    .ok_or(ReconError::UnknownElement { side: Side::New, id })?;
                let e = self.element(change.side(), id)?;
                let category = match e.category {
                    Some(c) => category_display_name(self.old, self.new, c),
                    None => NO_CATEGORY.to_string(),
                };
                Ok(ResultRow {
                    number: 0,
                    id,
                    name: e.name.clone(),
                    category,
                    change,
                })
            })
            .collect::<Result<Vec<_>, ReconError>>()?;

        rows.sort_by_key(|r| (r.change.rank(), r.id));
        for (i, row) in rows.iter_mut().enumerate() {
            row.number = i + 1;
        }
        Ok(rows)
    }

    fn element(&self, side: Side, id: ElementId) -> Result<&'a Element, ReconError> {
        let snapshot = match side {
            Side::Old => self.old,
            Side::New => self.new,
        };
        snapshot
            .get(id)
            .ok_or(ReconError::UnknownElement { side, id })
    }

    /// Every line, the ID line included, starts with `sep`.
    fn describe_with(
        &self,
        id: ElementId,
        change: ChangeType,
        include_unchanged: bool,
        sep: &str,
    ) -> Result<String, ReconError> {
        let origin = match change {
            ChangeType::Deleted => id,
            _ => self.result.origin_of(id),
        };

        let fields = match change {
            ChangeType::Modified => {
                let before = self.element(Side::Old, origin)?;
                let after = self.element(Side::New, id)?;
                compare_fields(before, after)
            }
            _ => list_fields(self.element(change.side(), id)?),
        };

        let mut out = Field::new("ID", origin.to_string(), id.to_string()).render(sep);

        let changed: String = fields
            .iter()
            .filter(|f| f.is_changed())
            .map(|f| f.render(sep))
            .collect();
        if !changed.is_empty() {
            out.push_str("\n\n===(Changed properties)===");
            out.push_str(&changed);
        }

        if include_unchanged {
            let unchanged: String = fields
                .iter()
                .filter(|f| !f.is_changed())
                .map(|f| f.render(sep))
                .collect();
            if !unchanged.is_empty() {
                out.push_str("\n\n===(Unchanged properties)===");
                out.push_str(&unchanged);
            }
        }

        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Field lines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Field {
    Changed {
        name: String,
        before: String,
        after: String,
    },
    Same {
        name: String,
        value: String,
    },
}

impl Field {
    fn new(name: &str, before: String, after: String) -> Self {
        if before == after {
            Self::Same {
                name: name.to_string(),
                value: before,
            }
        } else {
            Self::Changed {
                name: name.to_string(),
                before,
                after,
            }
        }
    }

    fn same(name: &str, value: String) -> Self {
        Self::Same {
            name: name.to_string(),
            value,
        }
    }

    fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }

    fn render(&self, sep: &str) -> String {
        match self {
            Self::Changed {
                name,
                before,
                after,
            } => format!("{sep}{name}: {before} -> {after}"),
            Self::Same { name, value } => format!("{sep}{name}: {value}"),
        }
    }
}

fn compare_fields(before: &Element, after: &Element) -> Vec<Field> {
    let mut fields = vec![
        Field::new("Name", before.name.clone(), after.name.clone()),
        Field::new(
            "Location",
            location_text(&before.location),
            location_text(&after.location),
        ),
    ];

    let (p0, p1) = (before.ordered_parameters(), after.ordered_parameters());
    for i in 0..p0.len().max(p1.len()) {
        let (b, a) = (p0.get(i), p1.get(i));
        let name = b.or(a).map(|p| p.definition_name.as_str()).unwrap_or_default();
        fields.push(Field::new(
            name,
            b.map(|p| storage_text(&p.storage)).unwrap_or_default(),
            a.map(|p| storage_text(&p.storage)).unwrap_or_default(),
        ));
    }
    fields
}

fn list_fields(e: &Element) -> Vec<Field> {
    let mut fields = vec![
        Field::same("Name", e.name.clone()),
        Field::same("Location", location_text(&e.location)),
    ];
    fields.extend(
        e.ordered_parameters()
            .into_iter()
            .map(|p| Field::same(&p.definition_name, storage_text(&p.storage))),
    );
    fields
}

pub fn storage_text(s: &Storage) -> String {
    match s {
        Storage::None => "None".into(),
        Storage::Integer(v) => v.to_string(),
        Storage::Double(v) => format!("{v:.6}"),
        Storage::String(v) => v.clone().unwrap_or_default(),
        Storage::ElementIdRef { target, display } => {
            format!("{} (ElementId={target}) ", display.as_deref().unwrap_or_default())
        }
    }
}

pub fn location_text(loc: &Location) -> String {
    match loc {
        Location::None => String::new(),
        Location::Point(p) => p.to_string(),
        Location::Curve(c) => match c.endpoints() {
            Ok((start, end)) => format!("{{start={start}, end={end}, length={}}}", c.length),
            Err(_) => format!("{{Curve not bound, length={}}}", c.length),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modeldiff_core::{CategoryId, Curve, Parameter, Xyz};

    fn fixture() -> (Snapshot, Snapshot, ReconciliationResult) {
        let old = Snapshot::new(
            "old",
            vec![
                Element::new(1, "Wall A")
                    .with_category(-2000011)
                    .with_parameter(Parameter::new(1, "Height", Storage::Double(3.0)))
                    .with_parameter(Parameter::new(2, "Mark", Storage::String(Some("W1".into())))),
                Element::new(3, "Gone"),
                Element::new(4, "Renamed").with_location(Location::Point(Xyz::new(1.0, 2.0, 3.0))),
            ],
        )
        .unwrap()
        .with_category_names([(CategoryId(-2000011), "OST_Walls")]);
        let new = Snapshot::new(
            "new",
            vec![
                Element::new(1, "Wall A")
                    .with_category(-2000011)
                    .with_parameter(Parameter::new(1, "Height", Storage::Double(3.5)))
                    .with_parameter(Parameter::new(2, "Mark", Storage::String(Some("W1".into())))),
                Element::new(8, "Fresh"),
                Element::new(9, "Renamed").with_location(Location::Point(Xyz::new(1.0, 2.0, 3.0))),
            ],
        )
        .unwrap();

        let mut result = ReconciliationResult::default();
        result.modified.insert(ElementId(1));
        result.deleted.insert(ElementId(3));
        result.added.insert(ElementId(8));
        result.unchanged.insert(ElementId(9));
        result.renames.insert(ElementId(9), ElementId(4));
        (old, new, result)
    }

    #[test]
    fn modified_element_sections() {
        let (old, new, result) = fixture();
        let report = Report::new(&old, &new, &result);
        let text = report
            .describe_element(ElementId(1), ChangeType::Modified, true)
            .unwrap();
        assert_eq!(
            text,
            "\nID: 1\n\n===(Changed properties)===\nHeight: 3.000000 -> 3.500000\
             \n\n===(Unchanged properties)===\nName: Wall A\nLocation: \nMark: W1"
        );

        let short = report
            .describe_element(ElementId(1), ChangeType::Modified, false)
            .unwrap();
        assert!(!short.contains("Unchanged properties"));
    }

    #[test]
    fn renamed_element_shows_old_id() {
        let (old, new, result) = fixture();
        let report = Report::new(&old, &new, &result);
        let text = report
            .describe_element(ElementId(9), ChangeType::Unchanged, true)
            .unwrap();
        assert!(text.starts_with("\nID: 4 -> 9"));
        assert!(text.contains("\nLocation: (1.000000, 2.000000, 3.000000)"));
    }

    #[test]
    fn partition_uses_inline_separator() {
        let (old, new, result) = fixture();
        let report = Report::new(&old, &new, &result);
        let text = report
            .describe_partition(&[ElementId(1)], ChangeType::Modified)
            .unwrap();
        assert_eq!(
            text,
            "1 elements are modified\n\n | ID: 1\n\n===(Changed properties)=== | Height: 3.000000 -> 3.500000"
        );
    }

    #[test]
    fn rows_sorted_by_rank() {
        let (old, new, result) = fixture();
        let report = Report::new(&old, &new, &result);
        let rows = report.rows(&result.all()).unwrap();
        let order: Vec<(usize, i64, &str)> = rows
            .iter()
            .map(|r| (r.number, r.id.0, r.change.symbol()))
            .collect();
        assert_eq!(order, vec![(1, 1, "*"), (2, 3, "-"), (3, 8, "+"), (4, 9, "=")]);
        assert_eq!(rows[0].category, "Walls");
        assert_eq!(rows[1].name, "Gone");
        assert_eq!(rows[1].category, "Null");
    }

    #[test]
    fn unknown_ids_are_errors() {
        let (old, new, result) = fixture();
        let report = Report::new(&old, &new, &result);
        let err = report
            .describe_element(ElementId(42), ChangeType::Added, true)
            .unwrap_err();
        assert!(matches!(err, ReconError::UnknownElement { side: Side::New, .. }));
        assert!(report.rows(&[ElementId(42)]).is_err());
    }

    #[test]
    fn value_text() {
        assert_eq!(storage_text(&Storage::None), "None");
        assert_eq!(storage_text(&Storage::Integer(-3)), "-3");
        assert_eq!(storage_text(&Storage::String(None)), "");
        assert_eq!(
            storage_text(&Storage::ElementIdRef {
                target: ElementId(311),
                display: Some("Level 1".into())
            }),
            "Level 1 (ElementId=311) "
        );
        assert_eq!(
            location_text(&Location::Curve(Curve::unbound(2.5))),
            "{Curve not bound, length=2.5}"
        );
        assert_eq!(
            location_text(&Location::Curve(Curve::line(
                Xyz::new(0.0, 0.0, 0.0),
                Xyz::new(4.0, 0.0, 0.0)
            ))),
            "{start=(0.000000, 0.000000, 0.000000), end=(4.000000, 0.000000, 0.000000), length=4}"
        );
    }

    #[test]
    fn custom_separator() {
        let (old, new, result) = fixture();
        let report = Report::new(&old, &new, &result).with_separator("; ");
        let text = report
            .describe_element(ElementId(8), ChangeType::Added, true)
            .unwrap();
        assert_eq!(text, "; ID: 8\n\n===(Unchanged properties)===; Name: Fresh; Location: ");
    }

    #[test]
    fn report_section_drives_describe() {
        let (old, new, result) = fixture();
        let config = crate::config::DiffConfig::from_toml(
            "[report]\ninclude_unchanged = false\nseparator = \" | \"",
        )
        .unwrap();
        let report = Report::from_config(&old, &new, &result, &config.report);
        assert_eq!(
            report.describe(ElementId(1), ChangeType::Modified).unwrap(),
            " | ID: 1\n\n===(Changed properties)=== | Height: 3.000000 -> 3.500000"
        );
        // The explicit flag still wins over the configured one.
        assert!(report
            .describe_element(ElementId(1), ChangeType::Modified, true)
            .unwrap()
            .ends_with("===(Unchanged properties)=== | Name: Wall A | Location:  | Mark: W1"));

        let defaults = Report::from_config(&old, &new, &result, &Default::default());
        assert_eq!(
            defaults.describe(ElementId(8), ChangeType::Added).unwrap(),
            "\nID: 8\n\n===(Unchanged properties)===\nName: Fresh\nLocation: "
        );
    }
}
