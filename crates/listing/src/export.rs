use std::borrow::Cow;

use crate::FieldAccess;

/// One column of a delimited export: a header plus how to render a row.
pub struct Column<'a, R> {
    header: Cow<'a, str>,
    accessor: Box<dyn Fn(&R) -> String + 'a>,
}

impl<'a, R> Column<'a, R> {
    pub fn new(header: impl Into<Cow<'a, str>>, accessor: impl Fn(&R) -> String + 'a) -> Self {
        Self {
            header: header.into(),
            accessor: Box::new(accessor),
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn render(&self, row: &R) -> String {
        (self.accessor)(row)
    }
}

impl<'a, R: FieldAccess> Column<'a, R> {
    /// Renders a named field as text; null and missing fields become `""`.
    pub fn field(header: impl Into<Cow<'a, str>>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(header, move |row: &R| {
            row.field(&name).map(ToString::to_string).unwrap_or_default()
        })
    }
}

pub(crate) fn delimited<'r, R: 'r>(
    rows: impl Iterator<Item = &'r R>,
    columns: &[Column<'_, R>],
) -> String {
    let header = columns
        .iter()
        .map(Column::header)
        .collect::<Vec<_>>()
        .join(",");

    let mut lines = vec![header];
    lines.extend(rows.map(|row| {
        columns
            .iter()
            .map(|column| quote(&column.render(row)))
            .collect::<Vec<_>>()
            .join(",")
    }));
    lines.join("\n")
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}
