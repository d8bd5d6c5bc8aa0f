/// Data layer: decoding, caching, windowing and balancing.
///
/// Architecture:
/// ```text
///  raw file (`w h` header + bytes)
///        │
///        ▼
///   ┌──────────┐      ┌──────────┐
///   │ decoder  │ ───► │ counter  │  labels at window centres (alpha only)
///   └──────────┘      └──────────┘
///        │                 │
///        ▼                 ▼
///   ┌──────────┐      ┌──────────┐
///   │  table   │      │ metadata │  cleaned_<file>.csv / cleaned_<file>.json
///   └──────────┘      └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  window  │  FeatureWindows (input) / LabelWindows (alpha)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ sampler  │  zip, one-hot, undersample to the rarest label
///   └──────────┘
/// ```

pub mod counter;
pub mod decoder;
pub mod metadata;
pub mod model;
pub mod sampler;
pub mod table;
pub mod window;
