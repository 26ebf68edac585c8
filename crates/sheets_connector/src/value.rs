/// Conversion of caller values into cell text.
///
/// Everything is stored as text remotely. Missing values (`None`, JSON
/// `null`) become the empty string.
pub trait RowValue {
    fn into_cell_text(self) -> String;
}

impl RowValue for String {
    fn into_cell_text(self) -> String {
        self
    }
}

impl RowValue for &str {
    fn into_cell_text(self) -> String {
        self.to_string()
    }
}

impl RowValue for &String {
    fn into_cell_text(self) -> String {
        self.clone()
    }
}

impl<T: RowValue> RowValue for Option<T> {
    fn into_cell_text(self) -> String {
        self.map(RowValue::into_cell_text).unwrap_or_default()
    }
}

impl RowValue for serde_json::Value {
    fn into_cell_text(self) -> String {
        match self {
            Self::Null => String::new(),
            Self::String(s) => s,
            other => other.to_string(),
        }
    }
}

macro_rules! display_row_value {
    ($($ty:ty),*) => {
        $(
            impl RowValue for $ty {
                fn into_cell_text(self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

display_row_value!(bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_values_are_empty() {
        assert_eq!("", None::<&str>.into_cell_text());
        assert_eq!("", json!(null).into_cell_text());
    }

    #[test]
    fn values_become_text() {
        assert_eq!("30", Some(30).into_cell_text());
        assert_eq!("true", true.into_cell_text());
        assert_eq!("1.5", 1.5f64.into_cell_text());
        assert_eq!("Ann", json!("Ann").into_cell_text());
        assert_eq!("[1,2]", json!([1, 2]).into_cell_text());
    }
}
