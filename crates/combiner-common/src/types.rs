use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Collaborator-supplied tags, merged verbatim into the response metadata.
pub type Tags = Map<String, Value>;

/// A dense numeric array stored in row-major order.
///
/// # Examples
///
/// ```
/// use combiner_common::types::NdArray;
///
/// let arr = NdArray::new(vec![2, 1], vec![1.0, 2.0]).unwrap();
/// assert_eq!(arr.shape(), &[2, 1]);
/// assert!(NdArray::new(vec![3], vec![1.0]).is_err());
/// assert!(NdArray::new(vec![usize::MAX, 2], vec![]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    values: Vec<f64>,
}

impl NdArray {
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Result<Self, String> {
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| format!("shape {shape:?} overflows the addressable size"))?;
        if expected != values.len() {
            return Err(format!(
                "shape {shape:?} requires {expected} values but {} were given",
                values.len()
            ));
        }
        Ok(Self { shape, values })
    }

    /// One-dimensional array over `values`.
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len()],
            values,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Wire form a numeric payload arrived in, kept so encoding reproduces it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArrayEncoding {
    /// Nested lists, e.g. `[[1, 2], [3, 4]]`.
    #[default]
    Ndarray,
    /// Flat `values` plus explicit `shape`.
    Tensor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefaultData {
    pub names: Vec<String>,
    pub array: NdArray,
    pub encoding: ArrayEncoding,
}

impl DefaultData {
    pub fn ndarray(array: NdArray) -> Self {
        Self {
            names: Vec::new(),
            array,
            encoding: ArrayEncoding::Ndarray,
        }
    }
}

/// Canonical, transport-agnostic prediction message. Exactly one payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Data(DefaultData),
    BinData(Vec<u8>),
    StrData(String),
}

impl Message {
    /// Feature names carried by the payload; empty for binary and text.
    pub fn feature_names(&self) -> &[String] {
        match self {
            Message::Data(data) => &data.names,
            Message::BinData(_) | Message::StrData(_) => &[],
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::Data(_) => "data",
            Message::BinData(_) => "binData",
            Message::StrData(_) => "strData",
        }
    }
}

/// Recognised metric kinds.
///
/// # Examples
///
/// ```
/// use combiner_common::types::MetricKind;
///
/// let kind: MetricKind = "GAUGE".parse().unwrap();
/// assert_eq!(kind, MetricKind::Gauge);
/// assert_eq!(kind.to_string(), "GAUGE");
/// assert!("gauge".parse::<MetricKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricKind {
    Counter,
    Gauge,
    Timer,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Counter => write!(f, "COUNTER"),
            MetricKind::Gauge => write!(f, "GAUGE"),
            MetricKind::Timer => write!(f, "TIMER"),
        }
    }
}

impl std::str::FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COUNTER" => Ok(MetricKind::Counter),
            "GAUGE" => Ok(MetricKind::Gauge),
            "TIMER" => Ok(MetricKind::Timer),
            _ => Err(format!("unknown metric type: {s}")),
        }
    }
}

/// A metric as reported by a collaborator, before its kind is checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedMetric {
    #[serde(rename = "type")]
    pub kind: String,
    pub key: String,
    pub value: f64,
}

impl ReportedMetric {
    pub fn new(kind: impl Into<String>, key: impl Into<String>, value: f64) -> Self {
        Self {
            kind: kind.into(),
            key: key.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    #[serde(rename = "type")]
    pub kind: MetricKind,
    pub key: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub tags: Tags,
    pub metrics: Vec<MetricEntry>,
}
