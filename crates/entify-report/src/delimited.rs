use entify_core::EntityRenderer;
use entify_model::{EntifyError, Info, Record, Result, Value};

/// Renders exported records as CSV, one row per record.
///
/// The header is the union of field names in first-seen order. Missing
/// fields are empty; lists and maps are written as JSON text. Info and
/// errors are not part of the output.
#[derive(Debug, Clone, Copy)]
pub struct CsvRenderer {
    delimiter: u8,
}

impl Default for CsvRenderer {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

fn records(data: Option<&Value>) -> Vec<&Record> {
    match data {
        Some(Value::List(items)) => items.iter().filter_map(Value::as_map).collect(),
        Some(Value::Map(record)) => vec![record],
        _ => Vec::new(),
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(value @ (Value::List(_) | Value::Map(_) | Value::Resource(_))) => {
            value.to_json().to_string()
        }
        Some(value) => value
            .as_text()
            .map(|text| text.into_owned())
            .unwrap_or_default(),
    }
}

fn render_error(err: impl ToString) -> EntifyError {
    EntifyError::Render(err.to_string())
}

impl EntityRenderer for CsvRenderer {
    type Output = String;

    fn generate(
        &self,
        data: Option<&Value>,
        _info: Option<&Info>,
        _errors: Option<&[String]>,
    ) -> Result<String> {
        let records = records(data);
        let mut header: Vec<&str> = Vec::new();
        for record in &records {
            for field in record.keys() {
                if !header.contains(&field.as_str()) {
                    header.push(field);
                }
            }
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        if !header.is_empty() {
            writer.write_record(&header).map_err(render_error)?;
        }
        for record in &records {
            let row: Vec<String> = header.iter().map(|field| cell(record.get(*field))).collect();
            writer.write_record(&row).map_err(render_error)?;
        }
        let bytes = writer.into_inner().map_err(render_error)?;
        String::from_utf8(bytes).map_err(render_error)
    }
}
