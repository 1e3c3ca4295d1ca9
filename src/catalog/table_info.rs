/// Metadata for one table of the dataset.
///
/// - `per_element`: one row per spatial element (spaxel) instead of per object.
/// - `aggregate`: a precomputed per-object summary table; joining it repeats
///   object rows, so compiled queries over it are grouped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    pub per_element: bool,
    pub aggregate: bool,
}

impl TableInfo {
    pub fn new(schema: &str, name: &str) -> Self {
        Self {
            schema: schema.to_string(),
            name: name.to_string(),
            per_element: false,
            aggregate: false,
        }
    }

    pub fn per_element(mut self) -> Self { self.per_element = true; self }
    pub fn aggregate(mut self) -> Self { self.aggregate = true; self }

    pub fn qualified(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}
