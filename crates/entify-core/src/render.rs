use entify_model::{Info, Result, Value};

/// Turns an exported batch into an external representation.
pub trait EntityRenderer {
    type Output;

    fn generate(
        &self,
        data: Option<&Value>,
        info: Option<&Info>,
        errors: Option<&[String]>,
    ) -> Result<Self::Output>;
}
