use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Three-state optional input field.
///
/// In a patch, `Absent` leaves the current value alone, `Null` clears it and
/// `Value` replaces it. Fields of this type must carry `#[serde(default)]` so
/// that a missing key decodes to `Absent` while an explicit `null` decodes to
/// `Null`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Nullable<T> {
    #[default]
    Absent,
    Null,
    Value(T),
}

impl<T> Nullable<T> {
    pub fn as_ref(&self) -> Nullable<&T> {
        match self {
            Nullable::Absent => Nullable::Absent,
            Nullable::Null => Nullable::Null,
            Nullable::Value(v) => Nullable::Value(v),
        }
    }

    pub fn map<B>(self, f: impl FnOnce(T) -> B) -> Nullable<B> {
        match self {
            Nullable::Absent => Nullable::Absent,
            Nullable::Null => Nullable::Null,
            Nullable::Value(v) => Nullable::Value(f(v)),
        }
    }

    /// Applies the edit to an optional current value.
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Nullable::Absent => current,
            Nullable::Null => None,
            Nullable::Value(v) => Some(v),
        }
    }

    /// `None` when absent, otherwise the requested new state.
    pub fn into_edit(self) -> Option<Option<T>> {
        match self {
            Nullable::Absent => None,
            Nullable::Null => Some(None),
            Nullable::Value(v) => Some(Some(v)),
        }
    }
}

impl<T, E> Nullable<std::result::Result<T, E>> {
    pub fn transpose(self) -> std::result::Result<Nullable<T>, E> {
        match self {
            Nullable::Absent => Ok(Nullable::Absent),
            Nullable::Null => Ok(Nullable::Null),
            Nullable::Value(r) => r.map(Nullable::Value),
        }
    }
}

impl<T> From<Option<T>> for Nullable<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Nullable::Value(v),
            None => Nullable::Null,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Nullable<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<T>::deserialize(deserializer)?.into())
    }
}

impl<T: Serialize> Serialize for Nullable<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Nullable::Value(v) => serializer.serialize_some(v),
            _ => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default)]
        subtitle: Nullable<String>,
    }

    #[test]
    fn test_three_states_decode() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"subtitle": null}"#).unwrap();
        let value: Patch = serde_json::from_str(r#"{"subtitle": "M31"}"#).unwrap();

        assert_eq!(absent.subtitle, Nullable::Absent);
        assert_eq!(null.subtitle, Nullable::Null);
        assert_eq!(value.subtitle, Nullable::Value("M31".to_string()));
    }

    #[test]
    fn test_apply() {
        let current = Some("old".to_string());
        assert_eq!(Nullable::Absent.apply(current.clone()), current);
        assert_eq!(Nullable::<String>::Null.apply(current.clone()), None);
        assert_eq!(Nullable::Value("new".to_string()).apply(current), Some("new".to_string()));
    }
}
