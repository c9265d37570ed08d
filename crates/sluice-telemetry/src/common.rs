/// Common span attribute names.
pub struct SpanAttribute;

impl SpanAttribute {
    pub const SOURCE_NAME: &'static str = "source.name";
    pub const SOURCE_TYPE: &'static str = "source.type";
    pub const QUERY_NAME: &'static str = "query.name";
    pub const QUERY_PATH: &'static str = "query.path";
}
