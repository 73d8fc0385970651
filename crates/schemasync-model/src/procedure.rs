//! Stored procedure descriptors.

use serde::{Deserialize, Serialize};

use crate::schema::SqlType;

/// Direction of a procedure call parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamDirection {
    /// Input parameter.
    In,
    /// Output parameter.
    Out,
    /// Parameter used for both input and output.
    InOut,
}

/// A single procedure call parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallParameter {
    /// Parameter name.
    pub name: String,
    /// SQL data type.
    pub sql_type: SqlType,
    /// Parameter direction.
    pub direction: ParamDirection,
}

impl CallParameter {
    /// Creates a new call parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: SqlType, direction: ParamDirection) -> Self {
        Self {
            name: name.into(),
            sql_type,
            direction,
        }
    }
}

/// A mapping descriptor for a database stored procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureSchema {
    /// Procedure name, unique within the owning model.
    pub name: String,
    /// Optional schema qualifier.
    pub schema: Option<String>,
    /// Optional catalog qualifier.
    pub catalog: Option<String>,
    /// Whether the procedure returns a value. When set, the first call
    /// parameter describes the return value.
    pub returning_value: bool,
    /// Ordered call parameters.
    pub parameters: Vec<CallParameter>,
}

impl ProcedureSchema {
    /// Creates a new procedure with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            catalog: None,
            returning_value: false,
            parameters: Vec::new(),
        }
    }

    /// Sets the schema qualifier.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Sets the catalog qualifier.
    #[must_use]
    pub fn catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    /// Marks the procedure as returning a value.
    #[must_use]
    pub fn returning_value(mut self) -> Self {
        self.returning_value = true;
        self
    }

    /// Adds a call parameter.
    #[must_use]
    pub fn parameter(mut self, parameter: CallParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Returns the procedure name including the schema qualifier, if present.
    #[must_use]
    pub fn fully_qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Returns the return-value descriptor: the first parameter, and only
    /// when the procedure is marked as returning a value.
    #[must_use]
    pub fn return_parameter(&self) -> Option<&CallParameter> {
        if self.returning_value {
            self.parameters.first()
        } else {
            None
        }
    }

    /// Returns the call parameters excluding the return-value descriptor.
    #[must_use]
    pub fn call_parameters(&self) -> &[CallParameter] {
        if self.returning_value && !self.parameters.is_empty() {
            &self.parameters[1..]
        } else {
            &self.parameters
        }
    }
}
