//! Renders map artifacts as standalone Leaflet pages.

use roamer_core::{MapArtifact, RenderError};
use serde::Serialize;

const LEAFLET_VERSION: &str = "1.9.4";

#[derive(Serialize)]
struct MarkerData<'a> {
    label: &'a str,
    description: &'a str,
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
struct MapData<'a> {
    center: [f64; 2],
    zoom: i32,
    markers: Vec<MarkerData<'a>>,
}

/// Renders `map` as an HTML page showing OpenStreetMap tiles with one
/// marker per location.
///
/// The page loads Leaflet from a CDN, so it needs network access to
/// display.
pub fn render_html(map: &MapArtifact) -> Result<String, RenderError> {
    let data = MapData {
        center: [map.center.latitude, map.center.longitude],
        zoom: map.zoom,
        markers: map
            .markers
            .iter()
            .map(|marker| MarkerData {
                label: &marker.label,
                description: &marker.description,
                lat: marker.coordinates.latitude,
                lon: marker.coordinates.longitude,
            })
            .collect(),
    };
    let data = script_safe_json(&data)
        .map_err(|err| RenderError::Renderer(err.to_string()))?;

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Suggested travel locations</title>
<meta name="viewport" content="width=device-width, initial-scale=1">
<link rel="stylesheet" href="https://unpkg.com/leaflet@{LEAFLET_VERSION}/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@{LEAFLET_VERSION}/dist/leaflet.js"></script>
<style>html, body, #map {{ height: 100%; margin: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
const data = {data};
const map = L.map("map").setView(data.center, data.zoom);
L.tileLayer("https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png", {{
  maxZoom: 19,
  attribution: "&copy; OpenStreetMap contributors",
}}).addTo(map);
for (const marker of data.markers) {{
  const popup = document.createElement("div");
  const title = document.createElement("strong");
  title.textContent = marker.label;
  popup.append(title);
  if (marker.description && marker.description !== marker.label) {{
    popup.append(document.createElement("br"), marker.description);
  }}
  L.marker([marker.lat, marker.lon])
    .bindTooltip(marker.label)
    .bindPopup(popup)
    .addTo(map);
}}
</script>
</body>
</html>
"#
    ))
}

/// Serializes `value` so it can sit inside a `<script>` element.
fn script_safe_json<T: Serialize>(
    value: &T,
) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    Ok(json
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029"))
}
