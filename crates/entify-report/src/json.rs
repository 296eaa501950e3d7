use entify_core::EntityRenderer;
use entify_model::{EntifyError, Info, Result, Value};
use serde::Serialize;

/// Renders `{"data", "info", "errors"}` as JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer {
    pretty: bool,
    include_rules: bool,
}

#[derive(Serialize)]
struct Document<'a> {
    data: Option<&'a Value>,
    info: Option<Info>,
    errors: Option<&'a [String]>,
}

impl JsonRenderer {
    pub fn new() -> Self {
        Self {
            pretty: false,
            include_rules: true,
        }
    }

    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Keep or drop the `rules` echo from the info block.
    #[must_use]
    pub fn include_rules(mut self, include: bool) -> Self {
        self.include_rules = include;
        self
    }
}

impl EntityRenderer for JsonRenderer {
    type Output = String;

    fn generate(
        &self,
        data: Option<&Value>,
        info: Option<&Info>,
        errors: Option<&[String]>,
    ) -> Result<String> {
        let info = info.map(|info| {
            let mut info = info.clone();
            if !self.include_rules {
                info.shift_remove("rules");
            }
            info
        });
        let document = Document { data, info, errors };
        let rendered = if self.pretty {
            serde_json::to_string_pretty(&document)
        } else {
            serde_json::to_string(&document)
        };
        rendered.map_err(|err| EntifyError::Render(err.to_string()))
    }
}
