//! Prompt composition for angle synthesis and scene composition.
//!
//! Every sequence places an instruction immediately before the image group it
//! describes. The model is sensitive to that ordering, so the builders here are
//! the only place requests are assembled.

use crate::models::{GenerationRequest, ImagePayload, PromptPart};

/// Substituted for an empty or whitespace-only user prompt.
pub const NO_ADDITIONAL_INSTRUCTIONS: &str = "No additional instructions.";

const ANGLE_PREAMBLE: &str = "You are a professional product photographer. Your task is to take a single product packshot and generate an additional, photorealistic image of the *same product* from a *completely different angle*. It is absolutely critical that you preserve the exact label design, text, cap, glass material, and liquid color. The background MUST be a neutral studio gray. Do not just return the original image. Here is the packshot:";

const STYLE_INTRO: &str = "You are an expert art director. Your task is to generate a new scene based on multiple inputs. First, observe the following images for style reference. You must capture their collective essence—mood, lighting, color, and composition—to define the art direction for the final image.";

const STYLE_OBJECT_INTRO: &str = "Next, here is a full set of product images showing the new bottle from multiple angles. It is CRITICAL that you use ALL of these images as a comprehensive 3D reference to accurately render the bottle, which MUST be the central subject of the new scene you create.";

const STYLE_FINAL: &str = "Now, generate a completely new and unique photorealistic scene that places the product bottle (using the multi-angle reference) within an environment that perfectly matches the art direction established by ALL of the style reference images. Do not copy elements from the reference scenes directly; create a new composition. Apply the user's additional instructions if provided:";

const SWAP_INTRO: &str = "You are an expert photo editor. Your task is to perform a photorealistic bottle swap. First, here is the reference scene. The goal is to replace the bottle within this scene.";

const SWAP_OBJECT_INTRO: &str = "Next, here is a full set of product images showing the new product bottle from multiple angles. It is CRITICAL that you use ALL of these images as a comprehensive 3D reference to accurately render the bottle that must be placed into the scene.";

const SWAP_FINAL: &str = "Now, seamlessly integrate the new bottle into the reference scene. The original bottle must be completely removed. The new bottle must be placed at an angle that is natural for the scene, using the provided multi-angle references to render it accurately while preserving its exact shape, label, and liquid color. Match the scene's lighting, shadows, and reflections for a photorealistic result. Apply the user's additional instructions if they are relevant:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraAngle {
    ThreeQuarterRight,
    SideProfile,
    HighTopDown,
    LowUpward,
}

impl CameraAngle {
    /// Dispatch order of the angle batch.
    pub const ALL: [CameraAngle; 4] = [
        CameraAngle::ThreeQuarterRight,
        CameraAngle::SideProfile,
        CameraAngle::HighTopDown,
        CameraAngle::LowUpward,
    ];

    pub fn instruction(&self) -> &'static str {
        match self {
            CameraAngle::ThreeQuarterRight => "Your specific task: Generate a new image of this bottle from a **three-quarter view from the right**. The bottle should be rotated about 45 degrees to the left from the original position.",
            CameraAngle::SideProfile => "Your specific task: Generate a new image of this bottle from a **direct side profile view (90-degree turn)**. Show the bottle as if it has been rotated exactly 90 degrees.",
            CameraAngle::HighTopDown => "Your specific task: Generate a new image of this bottle from a **high angle, looking down at the cap and shoulders** of the bottle. This should be a clear top-down perspective.",
            CameraAngle::LowUpward => "Your specific task: Generate a new image of this bottle from a **dramatic low angle, looking up from below the base**. The perspective should be from the ground up.",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CameraAngle::ThreeQuarterRight => "three-quarter right",
            CameraAngle::SideProfile => "side profile",
            CameraAngle::HighTopDown => "high top-down",
            CameraAngle::LowUpward => "low upward",
        }
    }
}

/// One request per [`CameraAngle`], in [`CameraAngle::ALL`] order.
pub fn compose_angle_requests(packshot: &ImagePayload) -> Vec<GenerationRequest> {
    CameraAngle::ALL
        .iter()
        .map(|angle| {
            GenerationRequest::new(vec![
                PromptPart::text(ANGLE_PREAMBLE),
                PromptPart::image(packshot.clone()),
                PromptPart::text(angle.instruction()),
            ])
        })
        .collect()
}

/// Builds the single request replicated across a composite batch.
///
/// Layout: intro, every reference image, object intro, every object image,
/// final instruction carrying the user's text.
pub fn compose_scene_request(
    references: &[ImagePayload],
    objects: &[ImagePayload],
    user_prompt: &str,
    style_only: bool,
) -> GenerationRequest {
    let (intro, object_intro, final_instruction) = if style_only {
        (STYLE_INTRO, STYLE_OBJECT_INTRO, STYLE_FINAL)
    } else {
        (SWAP_INTRO, SWAP_OBJECT_INTRO, SWAP_FINAL)
    };

    let mut parts = Vec::with_capacity(references.len() + objects.len() + 3);
    parts.push(PromptPart::text(intro));
    parts.extend(references.iter().cloned().map(PromptPart::image));
    parts.push(PromptPart::text(object_intro));
    parts.extend(objects.iter().cloned().map(PromptPart::image));
    parts.push(PromptPart::text(format!(
        "{} \"{}\"",
        final_instruction,
        user_instructions(user_prompt)
    )));

    GenerationRequest::new(parts)
}

fn user_instructions(user_prompt: &str) -> &str {
    if user_prompt.trim().is_empty() {
        NO_ADDITIONAL_INSTRUCTIONS
    } else {
        user_prompt
    }
}
