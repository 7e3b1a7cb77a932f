use combiner_common::proto;
use combiner_common::types::{Message, NdArray, ReportedMetric, Tags};
use std::sync::Arc;

/// One decoded input handed to a high-level collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateInput<'a> {
    Array(&'a NdArray),
    Binary(&'a [u8]),
    Text(&'a str),
}

impl<'a> AggregateInput<'a> {
    pub fn as_array(&self) -> Option<&'a NdArray> {
        match self {
            AggregateInput::Array(array) => Some(array),
            AggregateInput::Binary(_) | AggregateInput::Text(_) => None,
        }
    }
}

impl<'a> From<&'a Message> for AggregateInput<'a> {
    fn from(message: &'a Message) -> Self {
        match message {
            Message::Data(data) => AggregateInput::Array(&data.array),
            Message::BinData(bytes) => AggregateInput::Binary(bytes),
            Message::StrData(text) => AggregateInput::Text(text),
        }
    }
}

/// Result of a high-level aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregated {
    /// A freshly computed array.
    Array(NdArray),
    /// Pass input message `n` through unchanged.
    Select(usize),
}

/// Tags and metrics a collaborator attaches to high-level responses.
///
/// Both are read after every successful aggregation. Metrics are checked
/// against the recognised kinds only at that point.
pub trait MetadataSource: Send + Sync {
    fn tags(&self) -> Tags {
        Tags::new()
    }

    fn metrics(&self) -> Vec<ReportedMetric> {
        Vec::new()
    }
}

/// High-level contract: aggregation over decoded inputs.
///
/// `feature_names` runs parallel to `inputs`; entries are empty when a
/// message carries no names.
pub trait Aggregate: Send + Sync {
    fn aggregate(
        &self,
        inputs: &[AggregateInput<'_>],
        feature_names: &[&[String]],
    ) -> anyhow::Result<Aggregated>;
}

/// Low-level contract: aggregation over transport-native messages `M`.
///
/// The returned message is sent to the caller as-is; no metadata is merged.
pub trait LowLevelAggregate<M>: Send + Sync {
    fn aggregate_raw(&self, messages: &[M]) -> anyhow::Result<M>;
}

/// Metadata source for collaborators that report nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMetadata;

impl MetadataSource for NoMetadata {}

/// The capabilities a user collaborator exposes.
///
/// # Examples
///
/// ```
/// use combiner_core::model::{Aggregate, AggregateInput, Aggregated, MetadataSource, UserModel};
/// use std::sync::Arc;
///
/// struct PickFirst;
///
/// impl MetadataSource for PickFirst {}
///
/// impl Aggregate for PickFirst {
///     fn aggregate(&self, _: &[AggregateInput<'_>], _: &[&[String]]) -> anyhow::Result<Aggregated> {
///         Ok(Aggregated::Select(0))
///     }
/// }
///
/// let model = UserModel::from_aggregate(Arc::new(PickFirst));
/// assert!(model.has_high_level());
/// ```
#[derive(Clone)]
pub struct UserModel {
    pub(crate) name: String,
    pub(crate) metadata: Arc<dyn MetadataSource>,
    pub(crate) high_level: Option<Arc<dyn Aggregate>>,
    pub(crate) rest: Option<Arc<dyn LowLevelAggregate<serde_json::Value>>>,
    pub(crate) grpc: Option<Arc<dyn LowLevelAggregate<proto::SeldonMessage>>>,
}

impl UserModel {
    /// A model with no aggregation capability yet; add at least one before
    /// building a [`crate::Combiner`].
    pub fn new(metadata: Arc<dyn MetadataSource>) -> Self {
        Self {
            name: "user".to_string(),
            metadata,
            high_level: None,
            rest: None,
            grpc: None,
        }
    }

    /// A high-level model whose collaborator also supplies the metadata.
    pub fn from_aggregate<A>(aggregator: Arc<A>) -> Self
    where
        A: Aggregate + MetadataSource + 'static,
    {
        Self::new(aggregator.clone()).with_aggregate(aggregator)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_aggregate(mut self, aggregator: Arc<dyn Aggregate>) -> Self {
        self.high_level = Some(aggregator);
        self
    }

    pub fn with_rest(mut self, aggregator: Arc<dyn LowLevelAggregate<serde_json::Value>>) -> Self {
        self.rest = Some(aggregator);
        self
    }

    pub fn with_grpc(
        mut self,
        aggregator: Arc<dyn LowLevelAggregate<proto::SeldonMessage>>,
    ) -> Self {
        self.grpc = Some(aggregator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_high_level(&self) -> bool {
        self.high_level.is_some()
    }
}
