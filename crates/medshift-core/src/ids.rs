use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }
            pub fn from_str(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
    };
}

id_newtype!(StaffId);
id_newtype!(TaskId);
id_newtype!(ClinicId);
id_newtype!(LogEntryId);

impl ClinicId {
    /// Sentinel scope used when the caller does not name a clinic.
    pub fn default_clinic() -> Self {
        Self("default-clinic".to_string())
    }
}
