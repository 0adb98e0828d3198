use serde::Deserialize;

/// Optional predicates for the doctor search. Blank values are ignored.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DoctorSearchFilter {
    pub name: Option<String>,
    pub hospital: Option<String>,
    pub specialization: Option<String>,
}

impl DoctorSearchFilter {
    pub fn name(&self) -> Option<&str> {
        non_blank(&self.name)
    }

    pub fn hospital(&self) -> Option<&str> {
        non_blank(&self.hospital)
    }

    pub fn specialization(&self) -> Option<&str> {
        non_blank(&self.specialization)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
