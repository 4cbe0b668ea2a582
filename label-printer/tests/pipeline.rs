//! End-to-end label pipeline: encode → layout → preview / TSPL → transport

use label_printer::{
    build_command_stream, compute_layout_default, encode, send, DeviceUnit, LabelContent,
    LabelStyle, LayoutPlan, MediaSpec, PrintError, PrintJob, PrinterAddress, TsplOptions,
    MM_PER_INCH, POINTS_PER_INCH,
};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

const EPS: f32 = 1e-3;

fn plan_for(code: &str, article: &str, media: &MediaSpec) -> (LabelContent, LayoutPlan) {
    let content = LabelContent::new(code, article).unwrap();
    let encoded = encode(code).unwrap();
    let plan = compute_layout_default(&encoded.matrix, &content, media, DeviceUnit::Dot);
    (content, plan)
}

fn lines(data: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(data)
        .split("\r\n")
        .map(str::to_string)
        .collect()
}

/// Leading numeric arguments of a `BARCODE`/`TEXT` line
fn numeric_args(line: &str) -> Vec<f32> {
    let (_, args) = line.split_once(' ').unwrap();
    args.split(',')
        .map_while(|a| a.parse::<f32>().ok())
        .collect()
}

/// Modules the printer draws for a `BARCODE` line, from its type and payload
fn printed_modules(line: &str) -> usize {
    let payload = line
        .trim_end_matches('"')
        .rsplit_once('"')
        .map(|(_, p)| p)
        .unwrap();
    if line.contains(",\"EAN13\",") {
        return 95;
    }
    assert!(line.contains(",\"128M\","), "{}", line);
    let data = match payload.strip_prefix("!105") {
        Some(digits) => digits.len() / 2,
        None => payload.strip_prefix("!104").unwrap().chars().count(),
    };
    // start + data + check, then the 13-module stop
    11 * (data + 2) + 13
}

fn dots_to_points(dots: f32, media: &MediaSpec) -> f32 {
    dots / media.dot_density * POINTS_PER_INCH / MM_PER_INCH
}

#[test]
fn scenario_code128_bolt() {
    let job = PrintJob::new(
        LabelContent::new("ABC123", "Bolt M6").unwrap(),
        MediaSpec::default(),
        PrinterAddress::new("192.168.1.100", 9100),
    );
    let label = job.prepare(&LabelStyle::default()).unwrap();
    let data = label.command_stream(&TsplOptions::default());
    let lines = lines(&data);

    assert_eq!(lines[0], "SIZE 55 mm, 40 mm");
    assert_eq!(lines[1], "GAP 2 mm, 0 mm");
    assert_eq!(lines[2], "CLS");
    assert_eq!(lines.iter().filter(|l| l.starts_with("BARCODE ")).count(), 1);
    assert_eq!(lines.iter().filter(|l| l.starts_with("TEXT ")).count(), 2);
    assert!(data.ends_with(b"PRINT 1\r\n"));

    // Article line carries the windows-1251 prefix bytes
    let article = [0xC0, 0xF0, 0xF2, b':', b' ', b'B', b'o', b'l', b't', b' ', b'M', b'6'];
    assert!(data.windows(article.len()).any(|w| w == article));
}

#[test]
fn preview_matches_command_stream() {
    let media = MediaSpec::default();
    for (code, article) in [
        ("4006381333931", "Bolt M6"),
        ("ABC123", "Болт М6"),
        ("12345678", ""),
        ("12345678901", "odd digits"),
    ] {
        let (content, plan) = plan_for(code, article, &media);
        let encoded = encode(code).unwrap();
        let preview = label_printer::render_preview(&plan, &encoded.matrix, &content, &media);
        let data = build_command_stream(
            &plan,
            encoded.symbology,
            &content,
            &media,
            &TsplOptions::default(),
        );
        let lines = lines(&data);

        let barcode = lines.iter().find(|l| l.starts_with("BARCODE ")).unwrap();
        let args = numeric_args(barcode);
        let (x, y) = (args[0], args[1]);
        // x,y,"type" stops the numeric run; height follows the type token
        let rest: Vec<f32> = barcode
            .split(',')
            .skip(3)
            .map_while(|a| a.parse::<f32>().ok())
            .collect();
        let (height, narrow) = (rest[0], rest[3]);

        let first = preview.bars[0];
        assert!((first.x - dots_to_points(x, &media)).abs() < EPS, "{}", code);
        assert!((first.y - dots_to_points(y, &media)).abs() < EPS, "{}", code);
        assert!((first.height - dots_to_points(height, &media)).abs() < EPS, "{}", code);

        let narrowest = preview
            .bars
            .iter()
            .map(|b| b.width)
            .fold(f32::INFINITY, f32::min);
        assert!((narrowest - dots_to_points(narrow, &media)).abs() < EPS, "{}", code);

        let last = preview.bars[preview.bars.len() - 1];
        let preview_width = last.x + last.width - first.x;
        let printed_width = printed_modules(barcode) as f32 * narrow;
        assert!(
            (preview_width - dots_to_points(printed_width, &media)).abs() < EPS,
            "{}: preview {} pt, printer {} dots",
            code,
            preview_width,
            printed_width
        );

        let texts: Vec<&String> = lines.iter().filter(|l| l.starts_with("TEXT ")).collect();
        for (line, (cmd, shown)) in [&plan.code_line, &plan.article_line]
            .into_iter()
            .zip(texts.into_iter().zip(&preview.texts))
        {
            let args = numeric_args(cmd);
            assert!((shown.x - dots_to_points(args[0], &media)).abs() < EPS, "{}", code);
            let cell_top = shown.baseline_y - plan.to_points(line.baseline_y - line.top_y);
            assert!((cell_top - dots_to_points(args[1], &media)).abs() < EPS, "{}", code);
        }

        assert!((preview.page_width - dots_to_points(440.0, &media)).abs() < EPS);
        assert!((preview.page_height - dots_to_points(320.0, &media)).abs() < EPS);
    }
}

#[test]
fn plan_stays_inside_label() {
    let long = "X".repeat(80);
    let inputs = [
        ("4006381333931", "Bolt M6"),
        ("0", ""),
        ("ABC-123/xyz", "Very long article description that cannot fit on one line"),
        (long.as_str(), "overflow"),
        ("12345678901234567890", "digits"),
    ];
    for media in [
        MediaSpec::default(),
        MediaSpec::new(30.0, 20.0, 2.0, 8.0),
        MediaSpec::new(100.0, 60.0, 3.0, 12.0),
    ] {
        for (code, article) in inputs {
            let (_, plan) = plan_for(code, article, &media);
            let right = plan.barcode_origin.x + plan.barcode_size.width;
            let bottom = plan.barcode_origin.y + plan.barcode_size.height;
            assert!(plan.barcode_origin.x >= 0.0, "{} {:?}", code, media);
            assert!(right <= plan.label_width + EPS, "{} {:?}", code, media);
            assert!(bottom <= plan.label_height + EPS, "{} {:?}", code, media);
            assert!(plan.module_width > 0.0);
        }
    }
}

#[test]
fn outputs_are_idempotent() {
    let make = || {
        PrintJob::new(
            LabelContent::new("ABC123", "Bolt M6").unwrap(),
            MediaSpec::default(),
            PrinterAddress::new("127.0.0.1", 9100),
        )
        .prepare(&LabelStyle::default())
        .unwrap()
    };
    let (a, b) = (make(), make());
    assert_eq!(a.plan(), b.plan());
    assert_eq!(a.preview(), b.preview());
    assert_eq!(
        a.command_stream(&TsplOptions::default()),
        b.command_stream(&TsplOptions::default())
    );
}

#[tokio::test]
async fn print_delivers_command_stream() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        sock.read_to_end(&mut buf).await.unwrap();
        buf
    });

    let label = PrintJob::new(
        LabelContent::new("4006381333931", "Bolt M6").unwrap(),
        MediaSpec::default(),
        PrinterAddress::new("127.0.0.1", port),
    )
    .prepare(&LabelStyle::default())
    .unwrap();
    let expected = label.command_stream(&TsplOptions::default());
    label.print(&TsplOptions::default()).await.unwrap();

    assert_eq!(server.await.unwrap(), expected);
}

#[tokio::test]
async fn unreachable_printer_is_an_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let result = send(b"CLS\r\nPRINT 1\r\n", &PrinterAddress::new("127.0.0.1", port)).await;
    assert!(matches!(result, Err(PrintError::Connection(_))));
}
