use serde_json::Value;

use super::Filter;

/// Starts a filter on `field_name`.
///
/// ```rust,ignore
/// let energy = field("sector").eq("Energy").and(field("score").gte(60));
/// ```
pub fn field(field_name: &str) -> FluentFilter {
    FluentFilter {
        field_name: field_name.to_string(),
    }
}

pub struct FluentFilter {
    field_name: String,
}

impl FluentFilter {
    #[inline]
    pub fn eq<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Eq(self.field_name, value.into())
    }

    #[inline]
    pub fn ne<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Ne(self.field_name, value.into())
    }

    #[inline]
    pub fn gt<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Gt(self.field_name, value.into())
    }

    #[inline]
    pub fn gte<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Gte(self.field_name, value.into())
    }

    #[inline]
    pub fn lt<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Lt(self.field_name, value.into())
    }

    #[inline]
    pub fn lte<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Lte(self.field_name, value.into())
    }

    #[inline]
    pub fn in_array(self, values: Vec<Value>) -> Filter {
        Filter::In(self.field_name, values)
    }

    #[inline]
    pub fn not_in(self, values: Vec<Value>) -> Filter {
        Filter::Nin(self.field_name, values)
    }

    #[inline]
    pub fn exists(self) -> Filter {
        Filter::Exists(self.field_name, true)
    }

    #[inline]
    pub fn not_exists(self) -> Filter {
        Filter::Exists(self.field_name, false)
    }
}
