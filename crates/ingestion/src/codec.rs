//! Sample Decoder - JSON datagram ⇄ typed `Sample` / `MarkerFrame`
//!
//! Three schemas share the transport, tried in this order:
//! 1. nested: `{ tfluna: {..}, bno055: {..}, pos_m?, dist_m? }`
//! 2. flat:   `{ t, dist_cm, strength, temp_c, qw, qx, qy, qz, pos_m? }`
//! 3. marker list: `{ timestamp, markers: [{ id, tvec, rvec? }] }`
//!
//! A message that fails one schema falls through to the next.
//!
//! No range validation happens here; semantic checks belong to the fusion pipeline.

use contracts::{
    Datagram, DecodeError, Marker, MarkerFrame, OrientationReading, Quaternion, RangeReading,
    Sample, Vector3,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize)]
struct WireRange {
    #[serde(default)]
    timestamp: f64,
    distance_cm: f32,
    strength: i32,
    #[serde(default)]
    temperature_c: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireOrientation {
    #[serde(default)]
    timestamp: f64,
    qw: f32,
    qx: f32,
    qy: f32,
    qz: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct NestedMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tfluna: Option<WireRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bno055: Option<WireOrientation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pos_m: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct FlatMessage {
    #[serde(default)]
    t: f64,
    dist_cm: f32,
    strength: i32,
    #[serde(default)]
    temp_c: f32,
    qw: f32,
    qx: f32,
    qy: f32,
    qz: f32,
    #[serde(default)]
    pos_m: Option<Vec<f32>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMarker {
    id: i32,
    #[serde(default)]
    tvec: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rvec: Option<Vec<f32>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MarkerMessage {
    #[serde(default)]
    timestamp: f64,
    markers: Vec<WireMarker>,
}

/// Decode one datagram that must carry a sensor sample
pub fn decode(bytes: &[u8]) -> Result<Sample, DecodeError> {
    match decode_datagram(bytes)? {
        Datagram::Sample(sample) => Ok(sample),
        Datagram::Markers(_) => Err(DecodeError::malformed(
            "marker list where a sensor sample was expected",
        )),
    }
}

type SchemaDecoder = fn(&Value) -> Result<Datagram, DecodeError>;

/// Decode one datagram of any known schema
///
/// Each schema is attempted in order; the first that decodes wins.
pub fn decode_datagram(bytes: &[u8]) -> Result<Datagram, DecodeError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| DecodeError::malformed(format!("invalid json: {e}")))?;
    // serde 也接受数组形式的 struct，必须先排除
    if !value.is_object() {
        return Err(DecodeError::malformed("top-level value is not an object"));
    }

    let schemas: [SchemaDecoder; 3] = [decode_nested, decode_flat, decode_markers];
    let mut reasons = Vec::with_capacity(schemas.len());
    for decode_schema in schemas {
        match decode_schema(&value) {
            Ok(datagram) => return Ok(datagram),
            Err(DecodeError::Malformed { reason }) => reasons.push(reason),
        }
    }
    Err(DecodeError::malformed(format!(
        "no known schema matched ({})",
        reasons.join("; ")
    )))
}

fn decode_nested(value: &Value) -> Result<Datagram, DecodeError> {
    let message = NestedMessage::deserialize(value)
        .map_err(|e| DecodeError::malformed(format!("nested schema: {e}")))?;

    if message.tfluna.is_none() && message.bno055.is_none() {
        return Err(DecodeError::malformed("nested schema: no sub-records"));
    }

    Ok(Datagram::Sample(Sample {
        range: message.tfluna.map(|r| RangeReading {
            timestamp: r.timestamp,
            distance_cm: r.distance_cm,
            strength: r.strength,
            temperature_c: r.temperature_c,
        }),
        orientation: message.bno055.map(|o| OrientationReading {
            timestamp: o.timestamp,
            quaternion: Quaternion::new(o.qw, o.qx, o.qy, o.qz),
        }),
        absolute_position: position(message.pos_m.as_deref()),
    }))
}

fn decode_flat(value: &Value) -> Result<Datagram, DecodeError> {
    let message = FlatMessage::deserialize(value)
        .map_err(|e| DecodeError::malformed(format!("flat schema: {e}")))?;

    Ok(Datagram::Sample(Sample {
        range: Some(RangeReading {
            timestamp: message.t,
            distance_cm: message.dist_cm,
            strength: message.strength,
            temperature_c: message.temp_c,
        }),
        orientation: Some(OrientationReading {
            timestamp: message.t,
            quaternion: Quaternion::new(message.qw, message.qx, message.qy, message.qz),
        }),
        absolute_position: position(message.pos_m.as_deref()),
    }))
}

fn decode_markers(value: &Value) -> Result<Datagram, DecodeError> {
    let message = MarkerMessage::deserialize(value)
        .map_err(|e| DecodeError::malformed(format!("marker schema: {e}")))?;

    // Detections without a translation (e.g. corners only) are skipped
    let markers = message
        .markers
        .into_iter()
        .filter_map(|m| {
            position(Some(m.tvec.as_slice())).map(|position| Marker {
                id: m.id,
                position,
            })
        })
        .collect();

    Ok(Datagram::Markers(MarkerFrame {
        timestamp: message.timestamp,
        markers,
    }))
}

/// Fewer than three components means "no position"
fn position(values: Option<&[f32]>) -> Option<Vector3<f32>> {
    match values? {
        [x, y, z, ..] => Some(Vector3::new(*x, *y, *z)),
        _ => None,
    }
}

/// Encode a sample in the nested schema
pub fn encode(sample: &Sample) -> serde_json::Result<Vec<u8>> {
    let message = NestedMessage {
        tfluna: sample.range.map(|r| WireRange {
            timestamp: r.timestamp,
            distance_cm: r.distance_cm,
            strength: r.strength,
            temperature_c: r.temperature_c,
        }),
        bno055: sample.orientation.map(|o| WireOrientation {
            timestamp: o.timestamp,
            qw: o.quaternion.w,
            qx: o.quaternion.i,
            qy: o.quaternion.j,
            qz: o.quaternion.k,
        }),
        pos_m: sample.absolute_position.map(|p| vec![p.x, p.y, p.z]),
    };
    serde_json::to_vec(&message)
}

/// Encode a marker frame in the marker-list schema
pub fn encode_markers(frame: &MarkerFrame) -> serde_json::Result<Vec<u8>> {
    let message = MarkerMessage {
        timestamp: frame.timestamp,
        markers: frame
            .markers
            .iter()
            .map(|m| WireMarker {
                id: m.id,
                tvec: vec![m.position.x, m.position.y, m.position.z],
                rvec: None,
            })
            .collect(),
    };
    serde_json::to_vec(&message)
}
