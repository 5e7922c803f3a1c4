use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::{Cursor, Write};
use std::path::PathBuf;
use tch::{Device, Tensor, nn};

use crate::inference::config::PreprocessConfig;
use crate::inference::Pipeline;
use crate::inference::model::Model;
use crate::state::{AppState, DEFAULT_MAX_UPLOAD_BYTES};

fn encode(width: u32, height: u32, color: [u8; 3], format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image).write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    encode(width, height, color, ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    encode(width, height, color, ImageFormat::Jpeg)
}

/// Per-process scratch path so parallel test binaries do not collide.
pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("radiograph-{}-{}", std::process::id(), name))
}

/// A model whose network ignores its input and emits `logit`.
pub fn stub_model(logit: f32, input_shape: [i64; 3]) -> Model {
    let network = nn::func_t(move |xs, _train| {
        Tensor::from_slice(&[logit]).view([1, 1]).to_device(xs.device())
    });
    Model::from_module("stub", Box::new(network), Device::Cpu, input_shape)
}

fn named_stub(name: &'static str, logit: f32, preprocess: &PreprocessConfig) -> Model {
    let network = nn::func_t(move |_, _| Tensor::from_slice(&[logit]).view([1, 1]));
    Model::from_module(name, Box::new(network), Device::Cpu, preprocess.input_shape())
}

pub fn stub_state(brain_logit: f32, chest_logit: f32) -> AppState {
    let brain = PreprocessConfig::brain_tumor();
    let chest = PreprocessConfig::pneumonia();
    AppState::new(
        Pipeline::new(named_stub("brain-tumor", brain_logit, &brain), brain),
        Pipeline::new(named_stub("pneumonia", chest_logit, &chest), chest),
        Device::Cpu,
        DEFAULT_MAX_UPLOAD_BYTES,
    )
}

/// Single-part `multipart/form-data` body; `filename: None` makes a plain form field.
pub fn multipart_body(field: &str, filename: Option<&str>, data: &[u8]) -> (String, Vec<u8>) {
    const BOUNDARY: &str = "radiograph-test-boundary";
    let mut body = Vec::new();
    write!(body, "--{}\r\n", BOUNDARY).unwrap();
    match filename {
        Some(filename) => write!(
            body,
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            field, filename
        ),
        None => write!(
            body,
            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
            field
        ),
    }
    .unwrap();
    body.extend_from_slice(data);
    write!(body, "\r\n--{}--\r\n", BOUNDARY).unwrap();
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}
