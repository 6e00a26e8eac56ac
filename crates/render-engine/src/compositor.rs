//! ffmpeg command assembly.
//!
//! Translates render plans, cue sheets and sub-clip cuts into ffmpeg
//! invocations. Every visual is a delayed overlay on a black base, every
//! audio track a delayed branch into one `amix`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use reelsmith_common::{ReelError, ReelResult};
use reelsmith_scheduling_core::geometry::SubclipGeometry;
use reelsmith_timeline_model::{
    AspectRatio, CueSheet, FrameSize, MediaType, OverlayAnchor, PlannedAudio, PlannedVisual,
    RenderPlan, TextOverlay, VisualEffect,
};

use crate::ffmpeg::{base_args, EncodeSettings, FfmpegCommand};

/// Pixel margin for corner-anchored text.
const TEXT_MARGIN: u32 = 40;

const TEXT_CARD_FONT_SIZE: u32 = 90;

const MIX_SAMPLE_RATE: u32 = 44_100;

/// Frame rate of music-scored renders.
pub const SCORE_FPS: u32 = 60;

fn secs(value: f64) -> String {
    format!("{:.3}", value.max(0.0))
}

fn millis(value: f64) -> u64 {
    (value.max(0.0) * 1000.0).round() as u64
}

/// Escape text for a single-quoted drawtext `text=` value.
pub fn escape_drawtext(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push('\u{2019}'),
            ':' => out.push_str("\\:"),
            '%' => out.push_str("\\%"),
            _ => out.push(ch),
        }
    }
    out
}

/// drawtext `x`/`y` expressions for an anchor.
pub fn anchor_position(anchor: OverlayAnchor) -> (String, String) {
    let m = TEXT_MARGIN;
    match anchor {
        OverlayAnchor::Center => ("(w-text_w)/2".into(), "(h-text_h)/2".into()),
        OverlayAnchor::Bottom => ("(w-text_w)/2".into(), format!("h-text_h-{m}")),
        OverlayAnchor::TopLeft => (m.to_string(), m.to_string()),
        OverlayAnchor::TopRight => (format!("w-text_w-{m}"), m.to_string()),
        OverlayAnchor::BottomLeft => (m.to_string(), format!("h-text_h-{m}")),
        OverlayAnchor::BottomRight => (format!("w-text_w-{m}"), format!("h-text_h-{m}")),
        OverlayAnchor::Relative { x, y } => (format!("w*{x:.4}"), format!("h*{y:.4}")),
    }
}

fn font_option(font_file: Option<&Path>) -> String {
    match font_file {
        Some(path) => format!("fontfile='{}':", path.display()),
        None => String::new(),
    }
}

/// One drawtext filter for a timed overlay.
pub fn drawtext_filter(overlay: &TextOverlay, font_file: Option<&Path>) -> String {
    let (x, y) = anchor_position(overlay.anchor);
    let mut filter = format!(
        "drawtext={font}text='{text}':fontsize={size}:fontcolor={color}:x={x}:y={y}",
        font = font_option(font_file),
        text = escape_drawtext(&overlay.text),
        size = overlay.font_size,
        color = overlay.color,
    );
    if overlay.stroke_width > 0 {
        let _ = write!(filter, ":borderw={}:bordercolor=black", overlay.stroke_width);
    }
    let _ = write!(
        filter,
        ":enable='between(t,{},{})'",
        secs(overlay.start_secs),
        secs(overlay.end_secs)
    );
    filter
}

/// Positional ffmpeg inputs with their indices.
#[derive(Debug, Default)]
struct InputList {
    args: Vec<String>,
    count: usize,
}

impl InputList {
    fn push(&mut self, pre: &[String], path: &Path) -> usize {
        self.args.extend(pre.iter().cloned());
        self.args.push("-i".to_string());
        self.args.push(path.display().to_string());
        self.count += 1;
        self.count - 1
    }

    fn push_lavfi(&mut self, source: String) -> usize {
        self.args
            .extend(["-f".to_string(), "lavfi".to_string(), "-i".to_string(), source]);
        self.count += 1;
        self.count - 1
    }
}

fn effect_filters(effects: &[VisualEffect]) -> Vec<String> {
    effects
        .iter()
        .filter_map(|effect| match *effect {
            VisualEffect::Speed { .. } => None,
            VisualEffect::ColorBoost {
                color,
                luminance,
                contrast,
            } => Some(format!(
                "eq=saturation={color:.3}:brightness={luminance:.3}:contrast={:.3}",
                1.0 + contrast
            )),
            VisualEffect::MirrorX => Some("hflip".to_string()),
        })
        .collect()
}

fn speed_factor(effects: &[VisualEffect]) -> f64 {
    effects
        .iter()
        .map(|e| match e {
            VisualEffect::Speed { factor } if *factor > 0.0 => *factor,
            _ => 1.0,
        })
        .product()
}

/// Filter chain turning input `index` into a positioned visual stream.
fn visual_chain(visual: &PlannedVisual, index: usize, frame: FrameSize, label: &str) -> String {
    let speed = speed_factor(&visual.effects);
    let mut chain = vec![format!(
        "[{index}:v]trim=duration={}",
        secs(visual.source_span_secs)
    )];
    chain.push(format!(
        "setpts=(PTS-STARTPTS)/{speed:.4}+{}/TB",
        secs(visual.start_secs)
    ));
    match visual.fit {
        Some(fit) => {
            chain.push(format!("scale={}:{}", fit.scaled.width, fit.scaled.height));
            chain.push(format!(
                "crop={}:{}:{}:{}",
                fit.crop.width, fit.crop.height, fit.crop.x, fit.crop.y
            ));
            chain.push(format!("scale={}:{}", fit.output.width, fit.output.height));
        }
        None => chain.push(format!("scale={}:{}", frame.width, frame.height)),
    }
    chain.extend(effect_filters(&visual.effects));
    chain.push("setsar=1".to_string());
    format!("{}[{label}]", chain.join(","))
}

fn text_card_filters(visual: &PlannedVisual, font_file: Option<&Path>) -> Vec<String> {
    let enable = format!(
        "enable='between(t,{},{})'",
        secs(visual.start_secs),
        secs(visual.end_secs)
    );
    let text = visual.text.as_deref().unwrap_or_default();
    vec![
        format!("drawbox=x=0:y=0:w=iw:h=ih:color=black:t=fill:{enable}"),
        format!(
            "drawtext={font}text='{text}':fontsize={TEXT_CARD_FONT_SIZE}:fontcolor=white:x=(w-text_w)/2:y=(h-text_h)/2:{enable}",
            font = font_option(font_file),
            text = escape_drawtext(text),
        ),
    ]
}

fn audio_branch(index: usize, trim_secs: f64, audio: &AudioShape, label: &str) -> String {
    let mut chain = vec![
        format!("[{index}:a]atrim=duration={}", secs(trim_secs)),
        "asetpts=PTS-STARTPTS".to_string(),
    ];
    if (audio.tempo - 1.0).abs() > 1e-6 {
        chain.push(format!("atempo={:.4}", audio.tempo));
    }
    chain.push(format!("volume={:.3}", audio.volume));
    if audio.fade_in_secs > 0.0 {
        chain.push(format!("afade=t=in:st=0:d={}", secs(audio.fade_in_secs)));
    }
    if audio.fade_out_secs > 0.0 {
        chain.push(format!(
            "afade=t=out:st={}:d={}",
            secs(audio.length_secs - audio.fade_out_secs),
            secs(audio.fade_out_secs)
        ));
    }
    let delay = millis(audio.start_secs);
    chain.push(format!("adelay={delay}:all=1"));
    format!("{}[{label}]", chain.join(","))
}

struct AudioShape {
    start_secs: f64,
    length_secs: f64,
    volume: f64,
    tempo: f64,
    fade_in_secs: f64,
    fade_out_secs: f64,
}

impl From<&PlannedAudio> for AudioShape {
    fn from(audio: &PlannedAudio) -> Self {
        Self {
            start_secs: audio.start_secs,
            length_secs: audio.end_secs - audio.start_secs,
            volume: audio.volume_scale,
            tempo: 1.0,
            fade_in_secs: audio.fade_in_secs,
            fade_out_secs: audio.fade_out_secs,
        }
    }
}

fn mix_filter(labels: &[String], duration: &str) -> String {
    if labels.is_empty() {
        return format!(
            "anullsrc=channel_layout=stereo:sample_rate={MIX_SAMPLE_RATE}[aout]"
        );
    }
    format!(
        "{}amix=inputs={}:duration={duration}:normalize=0[aout]",
        labels.iter().map(|l| format!("[{l}]")).collect::<String>(),
        labels.len()
    )
}

/// Build the full-program render command.
pub fn program_command(
    plan: &RenderPlan,
    settings: &EncodeSettings,
    output: &Path,
) -> ReelResult<FfmpegCommand> {
    if plan.duration_secs <= 0.0 {
        return Err(ReelError::render("Program duration resolved to zero seconds"));
    }

    let frame = plan.frame;
    let font_file = settings.font_file.as_deref();
    let mut inputs = InputList::default();
    inputs.push_lavfi(format!(
        "color=c=black:s={}x{}:r={}:d={}",
        frame.width,
        frame.height,
        plan.fps,
        secs(plan.duration_secs)
    ));

    let mut graph: Vec<String> = vec![];
    let mut current = "0:v".to_string();
    let mut audio_labels: Vec<String> = vec![];

    for (i, visual) in plan.visuals.iter().enumerate() {
        let next = format!("s{i}");
        if visual.media_type == MediaType::Text {
            let filters = text_card_filters(visual, font_file);
            graph.push(format!("[{current}]{}[{next}]", filters.join(",")));
            current = next;
            continue;
        }

        let pre = if visual.media_type.is_still() {
            vec![
                "-loop".to_string(),
                "1".to_string(),
                "-framerate".to_string(),
                plan.fps.to_string(),
                "-t".to_string(),
                secs(visual.source_span_secs),
            ]
        } else {
            vec![]
        };
        let index = inputs.push(&pre, &visual.source);
        let label = format!("v{i}");
        graph.push(visual_chain(visual, index, frame, &label));
        graph.push(format!(
            "[{current}][{label}]overlay=x=(W-w)/2:y=(H-h)/2:eof_action=pass:enable='between(t,{},{})'[{next}]",
            secs(visual.start_secs),
            secs(visual.end_secs)
        ));
        current = next;

        if visual.media_type == MediaType::Video && visual.has_audio && plan.ambience_volume > 0.0
        {
            let label = format!("amb{i}");
            let shape = AudioShape {
                start_secs: visual.start_secs,
                length_secs: visual.end_secs - visual.start_secs,
                volume: plan.ambience_volume,
                tempo: speed_factor(&visual.effects),
                fade_in_secs: 0.0,
                fade_out_secs: 0.0,
            };
            graph.push(audio_branch(index, visual.source_span_secs, &shape, &label));
            audio_labels.push(label);
        }
    }

    let texts: Vec<String> = plan
        .overlays
        .iter()
        .map(|o| drawtext_filter(o, font_file))
        .collect();
    if texts.is_empty() {
        graph.push(format!("[{current}]null[vout]"));
    } else {
        graph.push(format!("[{current}]{}[vout]", texts.join(",")));
    }

    for (j, audio) in plan.audio.iter().enumerate() {
        let index = inputs.push(&[], &audio.source);
        let label = format!("a{j}");
        let shape = AudioShape::from(audio);
        graph.push(audio_branch(index, shape.length_secs, &shape, &label));
        audio_labels.push(label);
    }
    graph.push(mix_filter(&audio_labels, "longest"));

    let mut args = base_args();
    args.append(&mut inputs.args);
    args.extend([
        "-filter_complex".to_string(),
        graph.join(";"),
        "-map".to_string(),
        "[vout]".to_string(),
        "-map".to_string(),
        "[aout]".to_string(),
        "-r".to_string(),
        plan.fps.to_string(),
        "-aspect".to_string(),
        plan.aspect.as_ratio_str().to_string(),
        "-t".to_string(),
        secs(plan.duration_secs),
    ]);
    args.extend(settings.codec_args());
    args.push(output.display().to_string());

    tracing::info!(
        inputs = inputs.count,
        filters = graph.len(),
        duration_secs = plan.duration_secs,
        "Program command built"
    );

    Ok(FfmpegCommand {
        args,
        expected_duration_secs: plan.duration_secs,
        output: output.to_path_buf(),
    })
}

/// Build the command that mixes a cue sheet under an existing video.
pub fn score_command(
    source: &Path,
    source_frame: Option<FrameSize>,
    source_has_audio: bool,
    sheet: &CueSheet,
    duration_secs: f64,
    settings: &EncodeSettings,
    output: &Path,
) -> ReelResult<FfmpegCommand> {
    if duration_secs <= 0.0 {
        return Err(ReelError::render("Source has no duration to score"));
    }

    let mut inputs = InputList::default();
    inputs.push(&[], source);

    let mut graph = vec![];
    let mut labels = vec![];
    if source_has_audio {
        graph.push("[0:a]anull[src]".to_string());
        labels.push("src".to_string());
    }
    for (k, entry) in sheet.entries.iter().enumerate() {
        if entry.start_secs >= duration_secs {
            break;
        }
        let index = inputs.push(&[], &entry.source);
        let label = format!("m{k}");
        let shape = AudioShape {
            start_secs: entry.start_secs,
            length_secs: entry.duration_secs,
            volume: sheet.volume_scale,
            tempo: 1.0,
            fade_in_secs: entry.fade_in_secs,
            fade_out_secs: entry.fade_out_secs,
        };
        graph.push(audio_branch(index, entry.duration_secs, &shape, &label));
        labels.push(label);
    }
    graph.push(mix_filter(&labels, "longest"));

    let aspect = source_frame
        .map(AspectRatio::of_frame)
        .unwrap_or_default()
        .as_ratio_str();

    let mut args = base_args();
    args.append(&mut inputs.args);
    args.extend([
        "-filter_complex".to_string(),
        graph.join(";"),
        "-map".to_string(),
        "0:v:0".to_string(),
        "-map".to_string(),
        "[aout]".to_string(),
        "-r".to_string(),
        SCORE_FPS.to_string(),
        "-aspect".to_string(),
        aspect.to_string(),
        "-t".to_string(),
        secs(duration_secs),
    ]);
    args.extend(settings.codec_args());
    args.push(output.display().to_string());

    Ok(FfmpegCommand {
        args,
        expected_duration_secs: duration_secs,
        output: output.to_path_buf(),
    })
}

/// `-vf` chain realising a sub-clip geometry.
pub fn subclip_filter(geometry: SubclipGeometry) -> String {
    let chain = match geometry {
        SubclipGeometry::ScaleOnly { target } => {
            format!("scale={}:{}", target.width, target.height)
        }
        SubclipGeometry::Crop { scaled, window } => format!(
            "scale={}:{},crop={}:{}:{}:{}",
            scaled.width, scaled.height, window.width, window.height, window.x, window.y
        ),
        SubclipGeometry::Pad {
            scaled,
            x,
            y,
            target,
        } => format!(
            "scale={}:{},pad={}:{}:{}:{}:color=black",
            scaled.width, scaled.height, target.width, target.height, x, y
        ),
    };
    format!("{chain},setsar=1")
}

/// Caption-free sub-clip: the fit runs as a single `-vf` chain.
pub fn subclip_command(
    source: &Path,
    start_secs: f64,
    duration_secs: f64,
    geometry: SubclipGeometry,
    settings: &EncodeSettings,
    output: &Path,
) -> FfmpegCommand {
    let mut args = base_args();
    args.extend([
        "-ss".to_string(),
        secs(start_secs),
        "-t".to_string(),
        secs(duration_secs),
        "-i".to_string(),
        source.display().to_string(),
        "-vf".to_string(),
        subclip_filter(geometry),
    ]);
    args.extend(settings.codec_args());
    args.push(output.display().to_string());

    FfmpegCommand {
        args,
        expected_duration_secs: duration_secs,
        output: output.to_path_buf(),
    }
}

/// Graph for a captioned sub-clip. The source is fitted onto a black
/// canvas of the target size, so captions and video share the output
/// coordinate space.
pub fn captioned_subclip_graph(
    geometry: SubclipGeometry,
    duration_secs: f64,
    captions: &[TextOverlay],
    font_file: Option<&Path>,
) -> String {
    let (fit, target, x, y) = match geometry {
        SubclipGeometry::ScaleOnly { target } => {
            (format!("scale={}:{}", target.width, target.height), target, 0, 0)
        }
        SubclipGeometry::Crop { scaled, window } => (
            format!(
                "scale={}:{},crop={}:{}:{}:{}",
                scaled.width, scaled.height, window.width, window.height, window.x, window.y
            ),
            FrameSize::new(window.width, window.height),
            0,
            0,
        ),
        SubclipGeometry::Pad {
            scaled,
            x,
            y,
            target,
        } => (format!("scale={}:{}", scaled.width, scaled.height), target, x, y),
    };

    let mut graph = format!(
        "color=c=black:s={}x{}:d={}[canvas];[0:v]{fit},setsar=1[fit];\
         [canvas][fit]overlay={x}:{y}:shortest=1",
        target.width,
        target.height,
        secs(duration_secs),
    );
    for caption in captions {
        graph.push(',');
        graph.push_str(&drawtext_filter(caption, font_file));
    }
    graph.push_str("[vout]");
    graph
}

/// Captioned sub-clip: fit, composition and captions in one graph.
#[allow(clippy::too_many_arguments)]
pub fn captioned_subclip_command(
    source: &Path,
    start_secs: f64,
    duration_secs: f64,
    geometry: SubclipGeometry,
    captions: &[TextOverlay],
    settings: &EncodeSettings,
    output: &Path,
) -> FfmpegCommand {
    let mut args = base_args();
    args.extend([
        "-ss".to_string(),
        secs(start_secs),
        "-t".to_string(),
        secs(duration_secs),
        "-i".to_string(),
        source.display().to_string(),
        "-filter_complex".to_string(),
        captioned_subclip_graph(
            geometry,
            duration_secs,
            captions,
            settings.font_file.as_deref(),
        ),
        "-map".to_string(),
        "[vout]".to_string(),
        "-map".to_string(),
        "0:a?".to_string(),
    ]);
    args.extend(settings.codec_args());
    args.push(output.display().to_string());

    FfmpegCommand {
        args,
        expected_duration_secs: duration_secs,
        output: output.to_path_buf(),
    }
}

/// Build the command that extracts a cut's audio as mono 16 kHz WAV.
pub fn extract_audio_command(
    source: &Path,
    start_secs: f64,
    duration_secs: f64,
    output: &Path,
) -> FfmpegCommand {
    let mut args = base_args();
    args.extend([
        "-ss".to_string(),
        secs(start_secs),
        "-t".to_string(),
        secs(duration_secs),
        "-i".to_string(),
        source.display().to_string(),
        "-vn".to_string(),
        "-ac".to_string(),
        "1".to_string(),
        "-ar".to_string(),
        "16000".to_string(),
        "-c:a".to_string(),
        "pcm_s16le".to_string(),
        output.display().to_string(),
    ]);
    FfmpegCommand {
        args,
        expected_duration_secs: duration_secs,
        output: PathBuf::from(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelsmith_timeline_model::{
        CropWindow, CueEntry, MusicBlockKind, OverlayRole, PositionLayer, VisualFit,
    };

    fn value_after<'a>(args: &'a [String], flag: &str) -> &'a str {
        let i = args.iter().position(|a| a == flag).unwrap();
        &args[i + 1]
    }

    fn visual(media_type: MediaType, start: f64, end: f64) -> PlannedVisual {
        PlannedVisual {
            media_type,
            position_layer: PositionLayer::from("Scene"),
            render_sequence: 1,
            source: PathBuf::from("/media/clip"),
            text: None,
            has_audio: media_type == MediaType::Video,
            start_secs: start,
            end_secs: end,
            source_span_secs: end - start,
            effects: vec![],
            fit: Some(VisualFit {
                scaled: FrameSize::new(1920, 1080),
                crop: CropWindow {
                    x: 0,
                    y: 0,
                    width: 1920,
                    height: 1080,
                },
                output: FrameSize::new(1920, 1080),
            }),
        }
    }

    fn plan() -> RenderPlan {
        RenderPlan {
            aspect: AspectRatio::Landscape,
            frame: FrameSize::LANDSCAPE_HD,
            fps: 30,
            duration_secs: 20.0,
            music_video: false,
            ambience_volume: 0.4,
            visuals: vec![
                visual(MediaType::Image, 0.0, 0.85),
                visual(MediaType::Video, 0.85, 20.0),
            ],
            audio: vec![PlannedAudio {
                media_type: MediaType::Vocal,
                position_layer: PositionLayer::Narrator,
                render_sequence: 0,
                source: PathBuf::from("/media/narration.mp3"),
                start_secs: 0.85,
                end_secs: 18.0,
                volume_scale: 1.7,
                fade_in_secs: 0.0,
                fade_out_secs: 0.0,
            }],
            overlays: vec![TextOverlay {
                role: OverlayRole::Caption,
                text: "Hello".to_string(),
                start_secs: 1.0,
                end_secs: 1.4,
                anchor: OverlayAnchor::Bottom,
                font_size: 125,
                color: "white".to_string(),
                stroke_width: 5,
            }],
        }
    }

    #[test]
    fn test_escape_drawtext() {
        assert_eq!(escape_drawtext("It's 5:00 100%"), "It\u{2019}s 5\\:00 100\\%");
        assert_eq!(escape_drawtext("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_anchor_positions() {
        assert_eq!(
            anchor_position(OverlayAnchor::BottomRight),
            ("w-text_w-40".to_string(), "h-text_h-40".to_string())
        );
        assert_eq!(
            anchor_position(OverlayAnchor::Relative { x: 0.05, y: 0.2 }).1,
            "h*0.2000"
        );
    }

    #[test]
    fn test_program_command_layout() {
        let cmd = program_command(&plan(), &EncodeSettings::default(), Path::new("/out.mp4")).unwrap();
        let graph = value_after(&cmd.args, "-filter_complex");

        // black base, image, video, narration
        assert_eq!(cmd.args.iter().filter(|a| *a == "-i").count(), 4);
        assert!(graph.contains("enable='between(t,0.850,20.000)'"));
        assert!(graph.contains("volume=1.700"));
        assert!(graph.contains("adelay=850:all=1"));
        // ambience from the video plus narration
        assert!(graph.contains("amix=inputs=2"));
        assert!(graph.contains("volume=0.400"));
        assert!(graph.contains("text='Hello'"));
        assert_eq!(value_after(&cmd.args, "-t"), "20.000");
        assert_eq!(value_after(&cmd.args, "-aspect"), "16:9");
        assert_eq!(cmd.args.last().unwrap(), "/out.mp4");
    }

    #[test]
    fn test_muted_ambience_is_not_mixed() {
        let mut plan = plan();
        plan.ambience_volume = 0.0;
        let cmd = program_command(&plan, &EncodeSettings::default(), Path::new("/out.mp4")).unwrap();
        let graph = value_after(&cmd.args, "-filter_complex");
        assert!(graph.contains("amix=inputs=1"));
        assert!(!graph.contains("[amb1]"));
    }

    #[test]
    fn test_silent_program_uses_null_source() {
        let mut plan = plan();
        plan.audio.clear();
        plan.visuals.truncate(1);
        let cmd = program_command(&plan, &EncodeSettings::default(), Path::new("/out.mp4")).unwrap();
        assert!(value_after(&cmd.args, "-filter_complex").contains("anullsrc"));
    }

    #[test]
    fn test_text_card_drawn_without_input() {
        let mut plan = plan();
        let mut card = visual(MediaType::Text, 20.0, 22.0);
        card.text = Some("Chapter: One".to_string());
        card.fit = None;
        plan.visuals.push(card);
        let cmd = program_command(&plan, &EncodeSettings::default(), Path::new("/out.mp4")).unwrap();
        assert_eq!(cmd.args.iter().filter(|a| *a == "-i").count(), 4);
        assert!(value_after(&cmd.args, "-filter_complex").contains("text='Chapter\\: One'"));
    }

    #[test]
    fn test_zero_duration_plan_rejected() {
        let mut plan = plan();
        plan.duration_secs = 0.0;
        assert!(program_command(&plan, &EncodeSettings::default(), Path::new("/o")).is_err());
    }

    #[test]
    fn test_short_form_effects_in_chain() {
        let mut plan = plan();
        plan.visuals[1].effects = vec![
            VisualEffect::Speed { factor: 2.0 },
            VisualEffect::SHORT_FORM_BOOST,
            VisualEffect::MirrorX,
        ];
        let cmd = program_command(&plan, &EncodeSettings::default(), Path::new("/out.mp4")).unwrap();
        let graph = value_after(&cmd.args, "-filter_complex");
        assert!(graph.contains("setpts=(PTS-STARTPTS)/2.0000+0.850/TB"));
        assert!(graph.contains("eq=saturation=1.100"));
        assert!(graph.contains("hflip"));
        assert!(graph.contains("atempo=2.0000"));
    }

    #[test]
    fn test_score_command_fades_and_aspect() {
        let entry = |kind, start, fade_in, fade_out| CueEntry {
            kind,
            source: PathBuf::from("/blocks/x.wav"),
            start_secs: start,
            duration_secs: 60.0,
            fade_in_secs: fade_in,
            fade_out_secs: fade_out,
        };
        let sheet = CueSheet {
            entries: vec![
                entry(MusicBlockKind::Rise, 0.0, 0.0, 3.0),
                entry(MusicBlockKind::Baseline, 60.0, 3.0, 0.0),
            ],
            volume_scale: 0.2,
        };
        let cmd = score_command(
            Path::new("/in.mp4"),
            Some(FrameSize::new(1080, 1920)),
            true,
            &sheet,
            100.0,
            &EncodeSettings::default(),
            Path::new("/out.mp4"),
        )
        .unwrap();
        let graph = value_after(&cmd.args, "-filter_complex");
        assert!(graph.contains("amix=inputs=3"));
        assert_eq!(graph.matches("afade=t=in").count(), 1);
        assert!(graph.contains("afade=t=out:st=57.000:d=3.000"));
        assert!(graph.contains("volume=0.200"));
        assert_eq!(value_after(&cmd.args, "-aspect"), "9:16");
        assert_eq!(value_after(&cmd.args, "-r"), "60");
    }

    #[test]
    fn test_subclip_filters() {
        let crop = SubclipGeometry::Crop {
            scaled: FrameSize::new(3414, 1920),
            window: CropWindow {
                x: 1167,
                y: 0,
                width: 1080,
                height: 1920,
            },
        };
        assert_eq!(
            subclip_filter(crop),
            "scale=3414:1920,crop=1080:1920:1167:0,setsar=1"
        );
        let pad = SubclipGeometry::Pad {
            scaled: FrameSize::new(1080, 606),
            x: 0,
            y: 657,
            target: FrameSize::new(1080, 1920),
        };
        assert!(subclip_filter(pad).contains("pad=1080:1920:0:657:color=black"));
    }

    #[test]
    fn test_subclip_command_seeks_before_input() {
        let cmd = subclip_command(
            Path::new("/src.mp4"),
            30.0,
            15.0,
            SubclipGeometry::ScaleOnly {
                target: FrameSize::LANDSCAPE_HD,
            },
            &EncodeSettings::default(),
            Path::new("/cut.mp4"),
        );
        let ss = cmd.args.iter().position(|a| a == "-ss").unwrap();
        let input = cmd.args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input);
        assert_eq!(value_after(&cmd.args, "-vf"), "scale=1920:1080,setsar=1");
        assert_eq!(cmd.expected_duration_secs, 15.0);
    }

    #[test]
    fn test_captioned_subclip_composes_on_target_canvas() {
        let pad = SubclipGeometry::Pad {
            scaled: FrameSize::new(1080, 606),
            x: 0,
            y: 657,
            target: FrameSize::new(1080, 1920),
        };
        let caption = TextOverlay {
            role: OverlayRole::Caption,
            text: "line".to_string(),
            start_secs: 0.8,
            end_secs: 1.2,
            anchor: OverlayAnchor::Center,
            font_size: 90,
            color: "yellow".to_string(),
            stroke_width: 5,
        };
        let cmd = captioned_subclip_command(
            Path::new("/src.mp4"),
            30.0,
            15.0,
            pad,
            &[caption],
            &EncodeSettings::default(),
            Path::new("/cut.mp4"),
        );

        assert!(!cmd.args.iter().any(|a| a == "-vf"));
        let graph = value_after(&cmd.args, "-filter_complex");
        assert!(graph.starts_with("color=c=black:s=1080x1920:d=15.000[canvas]"));
        assert!(graph.contains("[0:v]scale=1080:606,setsar=1[fit]"));
        assert!(graph.contains("overlay=0:657:shortest=1,drawtext="));
        assert!(!graph.contains("pad="));
        assert!(graph.ends_with("[vout]"));
        assert_eq!(value_after(&cmd.args, "-map"), "[vout]");
        assert!(cmd.args.iter().any(|a| a == "0:a?"));
    }

    #[test]
    fn test_captioned_crop_canvas_matches_window() {
        let crop = SubclipGeometry::Crop {
            scaled: FrameSize::new(3414, 1920),
            window: CropWindow {
                x: 1167,
                y: 0,
                width: 1080,
                height: 1920,
            },
        };
        let graph = captioned_subclip_graph(crop, 10.0, &[], None);
        assert!(graph.contains("s=1080x1920"));
        assert!(graph.contains("crop=1080:1920:1167:0"));
        assert!(graph.contains("overlay=0:0:shortest=1[vout]"));
    }
}
