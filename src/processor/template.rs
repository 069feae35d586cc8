use super::conversation::{ContentPart, Message};

const IM_START: &str = "<|im_start|>";
const IM_END: &str = "<|im_end|>";
const VIDEO_PLACEHOLDER: &str = "<|vision_start|><|video_pad|><|vision_end|>";
const IMAGE_PLACEHOLDER: &str = "<|vision_start|><|image_pad|><|vision_end|>";

/// Renders a conversation in the ChatML layout used by Qwen-VL checkpoints.
/// Visual parts become placeholders; the engine expands them into patches.
pub fn render(messages: &[Message], add_generation_prompt: bool) -> String {
    let mut prompt = String::new();

    for message in messages {
        prompt.push_str(IM_START);
        prompt.push_str(message.role.as_str());
        prompt.push('\n');
        for part in &message.content {
            match part {
                ContentPart::Video { .. } => prompt.push_str(VIDEO_PLACEHOLDER),
                ContentPart::Image { .. } => prompt.push_str(IMAGE_PLACEHOLDER),
                ContentPart::Text { text } => prompt.push_str(text),
            }
        }
        prompt.push_str(IM_END);
        prompt.push('\n');
    }

    if add_generation_prompt {
        prompt.push_str(IM_START);
        prompt.push_str("assistant\n");
    }

    prompt
}
