//! The fixed extraction instruction sent with every half-page image.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the JSON keys it demands (`numero`,
//!    `pregunta`, `respuesta`) are the same keys [`crate::output::Record`]
//!    deserialises; changing one side means changing the other.
//!
//! 2. **Testability** — unit tests can assert the prompt still pins the
//!    output contract (JSON array, null rule) without calling a model.
//!
//! Callers can override the default via
//! [`crate::config::BatchConfig::instruction`]; the constant here is used
//! only when no override is provided.

/// Default instruction for extracting marked answers from a questionnaire
/// half-page.
///
/// The questionnaires this tool was built for are printed in Spanish, so the
/// prompt is too — the model must echo the question text verbatim, and a
/// translated prompt measurably increases the rate of translated echoes.
pub const EXTRACTION_PROMPT: &str = r#"Analiza la imagen adjunta. La imagen contiene un cuestionario con preguntas numeradas en filas.

Cada fila tiene:
- un número de pregunta
- el texto de la pregunta en español
- una escala de respuesta del 1 al 5, donde solo un número está rodeado/circulado

Tu tarea es extraer únicamente la información que esté claramente marcada. Para cada fila, devuelve:

- numero: número de la pregunta
- pregunta: texto exacto de la pregunta
- respuesta: número que está rodeado

Reglas importantes:
- Considera como respuesta solo el número que esté visualmente rodeado o marcado.
- Si una fila no tiene ningún número claramente rodeado, incluye la fila con "respuesta": null.

No infieras ni adivines respuestas. Mantén el texto original en español

Devuelve el resultado exclusivamente en formato JSON, como una lista de objetos, sin texto adicional. Ejemplo de salida esperada:

[
  {
    "numero": 53,
    "pregunta": "Está triste.",
    "respuesta": 1
  }
]
"#;
