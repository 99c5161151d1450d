use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use voc2coco::coco::{Annotation, Category, CocoFile};
use voc2coco::config::{validate_extension, Cli, Command, ImageOrder, SplitSpec};
use voc2coco::external::{default_model_options, Invocation, ModelOption, ModelRunner};
use voc2coco::utils::trailing_number;
use voc2coco::voc::{parse_annotation, parse_annotation_str};
use voc2coco::{BoundingBox, Error};

fn voc_object(xmin: &str, ymin: &str, xmax: &str, ymax: &str) -> String {
    format!(
        "<object><name>person</name><pose>Unspecified</pose><truncated>0</truncated>\
         <difficult>0</difficult><bndbox><xmin>{}</xmin><ymin>{}</ymin>\
         <xmax>{}</xmax><ymax>{}</ymax></bndbox></object>",
        xmin, ymin, xmax, ymax
    )
}

fn voc_document(objects: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<annotation>\
         <folder>train</folder><filename>Image_1.png</filename>\
         <size><width>600</width><height>480</height><depth>3</depth></size>\
         <segmented>0</segmented>{}</annotation>",
        objects.concat()
    )
}

#[test]
fn test_parse_annotation_keeps_document_order() {
    let xml = voc_document(&[
        voc_object("10", "20", "50", "80"),
        voc_object("100", "110", "140", "200"),
        voc_object("5", "6", "7", "8"),
    ]);

    let boxes = parse_annotation_str(&xml, Path::new("Image_1.xml")).unwrap();

    assert_eq!(
        boxes,
        vec![
            BoundingBox::new(10, 20, 50, 80),
            BoundingBox::new(100, 110, 140, 200),
            BoundingBox::new(5, 6, 7, 8),
        ]
    );
}

#[test]
fn test_parse_annotation_without_objects_is_empty() {
    let xml = voc_document(&[]);
    let boxes = parse_annotation_str(&xml, Path::new("Image_2.xml")).unwrap();
    assert!(boxes.is_empty());
}

#[test]
fn test_parse_annotation_missing_bndbox() {
    let xml = voc_document(&["<object><name>person</name></object>".to_string()]);
    let err = parse_annotation_str(&xml, Path::new("Image_3.xml")).unwrap_err();
    assert!(matches!(err, Error::MalformedAnnotation { .. }));
    assert_eq!(err.path(), Some(Path::new("Image_3.xml")));
}

#[test]
fn test_parse_annotation_missing_coordinate() {
    let xml = voc_document(&[
        "<object><bndbox><xmin>1</xmin><ymin>2</ymin><xmax>3</xmax></bndbox></object>".to_string(),
    ]);
    let err = parse_annotation_str(&xml, Path::new("Image_4.xml")).unwrap_err();
    assert!(matches!(err, Error::MalformedAnnotation { .. }));
}

#[test]
fn test_parse_annotation_non_integer_coordinate() {
    let xml = voc_document(&[voc_object("10.5", "20", "50", "80")]);
    let err = parse_annotation_str(&xml, Path::new("Image_5.xml")).unwrap_err();
    assert!(matches!(err, Error::MalformedAnnotation { .. }));

    let xml = voc_document(&[voc_object("ten", "20", "50", "80")]);
    let err = parse_annotation_str(&xml, Path::new("Image_5.xml")).unwrap_err();
    assert!(matches!(err, Error::MalformedAnnotation { .. }));
}

#[test]
fn test_parse_annotation_invalid_xml() {
    let xml = "<annotation><object><bndbox><xmin>1</xmin></object></annotation>";
    let err = parse_annotation_str(xml, Path::new("broken.xml")).unwrap_err();
    assert!(matches!(err, Error::MalformedAnnotation { .. }));
}

#[test]
fn test_parse_annotation_surfaces_degenerate_boxes() {
    let xml = voc_document(&[voc_object("50", "20", "50", "80")]);
    let err = parse_annotation_str(&xml, Path::new("flat.xml")).unwrap_err();
    match err {
        Error::MalformedAnnotation { reason, .. } => assert!(reason.contains("degenerate")),
        other => panic!("unexpected error: {:?}", other),
    }

    let xml = voc_document(&[voc_object("10", "90", "50", "80")]);
    assert!(parse_annotation_str(&xml, Path::new("flipped.xml")).is_err());
}

#[test]
fn test_parse_annotation_objects_between_other_elements() {
    let xml = format!(
        "<annotation><filename>Image_8.png</filename>{}<segmented>0</segmented>{}\
         <size><width>600</width><height>480</height></size>{}</annotation>",
        voc_object("1", "2", "3", "4"),
        voc_object("5", "6", "7", "8"),
        voc_object("9", "10", "11", "12"),
    );

    let boxes = parse_annotation_str(&xml, Path::new("Image_8.xml")).unwrap();

    assert_eq!(
        boxes,
        vec![
            BoundingBox::new(1, 2, 3, 4),
            BoundingBox::new(5, 6, 7, 8),
            BoundingBox::new(9, 10, 11, 12),
        ]
    );
}

#[test]
fn test_parse_annotation_ignores_part_boxes() {
    let xml = voc_document(&[
        "<object><name>person</name><bndbox><xmin>10</xmin><ymin>20</ymin>\
         <xmax>50</xmax><ymax>80</ymax></bndbox><part><name>head</name>\
         <bndbox><xmin>12</xmin><ymin>22</ymin><xmax>20</xmax><ymax>30</ymax></bndbox>\
         </part></object>"
            .to_string(),
    ]);
    let boxes = parse_annotation_str(&xml, Path::new("Image_9.xml")).unwrap();
    assert_eq!(boxes, vec![BoundingBox::new(10, 20, 50, 80)]);
}

#[test]
fn test_parse_annotation_rejects_content_after_root() {
    for xml in [
        "<annotation></annotation><junk",
        "<annotation></annotation><annotation></annotation>",
        "<annotation></annotation>trailing text",
        "",
    ] {
        let err = parse_annotation_str(xml, Path::new("trailing.xml")).unwrap_err();
        assert!(
            matches!(err, Error::MalformedAnnotation { .. }),
            "{:?} was not rejected: {:?}",
            xml,
            err
        );
    }
}

#[test]
fn test_parse_annotation_rejects_overflowing_coordinates() {
    let min = i64::MIN.to_string();
    let max = i64::MAX.to_string();
    let cases = [
        voc_object(&min, "0", &max, "10"),
        voc_object("0", &min, "10", &max),
        // width and height fit, their product does not
        voc_object("0", "0", "4000000000", "4000000000"),
    ];
    for object in cases {
        let xml = voc_document(&[object]);
        let err = parse_annotation_str(&xml, Path::new("huge.xml")).unwrap_err();
        match err {
            Error::MalformedAnnotation { reason, .. } => assert!(reason.contains("too large")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    // out of i64 range altogether
    let xml = voc_document(&[voc_object("0", "0", "9223372036854775808", "10")]);
    let err = parse_annotation_str(&xml, Path::new("huge.xml")).unwrap_err();
    assert!(matches!(err, Error::MalformedAnnotation { .. }));
}

#[test]
fn test_parse_annotation_from_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("Image_7.xml");
    fs::write(&path, voc_document(&[voc_object("1", "2", "3", "4")])).unwrap();

    let boxes = parse_annotation(&path).unwrap();
    assert_eq!(boxes, vec![BoundingBox::new(1, 2, 3, 4)]);

    let missing = temp_dir.path().join("nope.xml");
    let err = parse_annotation(&missing).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    assert_eq!(err.path(), Some(missing.as_path()));
}

#[test]
fn test_bounding_box_geometry() {
    let bbox = BoundingBox::new(10, 20, 50, 80);
    assert_eq!(bbox.width(), 40);
    assert_eq!(bbox.height(), 60);
    assert_eq!(bbox.area(), 2400);
    assert_eq!(bbox.to_xywh(), [10, 20, 40, 60]);
    assert!(!bbox.is_degenerate());
    assert!(BoundingBox::new(0, 0, 0, 5).is_degenerate());
    assert_eq!(bbox.checked_area(), Some(2400));

    let huge = BoundingBox::new(i64::MIN, 0, i64::MAX, 1);
    assert_eq!(huge.checked_area(), None);
    assert_eq!(huge.width(), i64::MAX);
    assert!(!huge.is_degenerate());
}

#[test]
fn test_annotation_from_box() {
    let annotation = Annotation::from_box(7, 3, &BoundingBox::new(10, 20, 50, 80));
    assert_eq!(
        annotation,
        Annotation {
            iscrowd: 0,
            image_id: 3,
            bbox: [10, 20, 40, 60],
            area: 2400,
            category_id: 1,
            id: 7,
        }
    );
    assert_eq!(annotation.area, annotation.bbox[2] * annotation.bbox[3]);
}

#[test]
fn test_coco_template_serialization() {
    let template = CocoFile::template("IIT Delhi Dataset");
    assert_eq!(template.categories, vec![Category::person()]);
    assert_eq!(
        serde_json::to_string(&template).unwrap(),
        r#"{"info":{"description":"IIT Delhi Dataset"},"images":[],"annotations":[],"categories":[{"supercategory":"person","id":1,"name":"person"}]}"#
    );
}

#[test]
fn test_split_spec_parsing() {
    let split: SplitSpec = "valid=val2017".parse().unwrap();
    assert_eq!(split, SplitSpec::new("valid", "val2017"));
    assert_eq!(split.annotation_file_name(), "instances_val2017.json");
    assert_eq!(split.to_string(), "valid=val2017");

    assert!("valid".parse::<SplitSpec>().is_err());
    assert!("=val2017".parse::<SplitSpec>().is_err());
    assert!("valid=../val".parse::<SplitSpec>().is_err());
    assert!("valid=..".parse::<SplitSpec>().is_err());
}

#[test]
fn test_split_descriptions() {
    let base = "IIT Delhi Dataset";
    assert_eq!(SplitSpec::new("train", "train2017").description(base), base);
    assert_eq!(
        SplitSpec::new("valid", "val2017").description(base),
        "IIT Delhi Dataset - Val"
    );
    assert_eq!(
        SplitSpec::new("test", "test2017").description(base),
        "IIT Delhi Dataset - Test"
    );
}

#[test]
fn test_validate_extension() {
    assert_eq!(validate_extension("png").unwrap(), "png");
    assert_eq!(validate_extension(".JPG").unwrap(), "jpg");
    assert!(validate_extension("xml").is_err());
    assert!(validate_extension("").is_err());
}

#[test]
fn test_trailing_number() {
    assert_eq!(trailing_number(Path::new("Image_00014.png")), Some(14));
    assert_eq!(trailing_number(Path::new("dir/Image_7.png")), Some(7));
    assert_eq!(trailing_number(Path::new("cam2_frame10.png")), Some(10));
    assert_eq!(trailing_number(Path::new("Image_é3.png")), Some(3));
    assert_eq!(trailing_number(Path::new("cover.png")), None);
}

#[test]
fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn test_cli_convert_defaults() {
    let cli = Cli::try_parse_from(["voc2coco", "convert", "-d", "/content/Dataset"]).unwrap();
    let args = match cli.command {
        Command::Convert(args) => args,
        other => panic!("unexpected command: {:?}", other),
    };

    let config = args.to_convert_config();
    assert_eq!(config.dataset_dir, PathBuf::from("/content/Dataset"));
    assert_eq!(config.output_dir, config.dataset_dir);
    assert_eq!(
        config.splits,
        vec![
            SplitSpec::new("train", "train2017"),
            SplitSpec::new("valid", "val2017")
        ]
    );
    assert_eq!(config.selection.extensions, vec!["png".to_string()]);
    assert_eq!(config.selection.order, ImageOrder::Lexicographic);
    assert!(config.copy_images);
}

#[test]
fn test_cli_convert_overrides() {
    let cli = Cli::try_parse_from([
        "voc2coco",
        "convert",
        "-d",
        "data",
        "-o",
        "out",
        "--split",
        "train=train2017",
        "--image_ext",
        "png,.JPG",
        "--order",
        "numeric",
        "--skip_images",
    ])
    .unwrap();
    let config = match cli.command {
        Command::Convert(args) => args.to_convert_config(),
        other => panic!("unexpected command: {:?}", other),
    };

    assert_eq!(config.output_dir, PathBuf::from("out"));
    assert_eq!(config.splits, vec![SplitSpec::new("train", "train2017")]);
    assert_eq!(config.selection.extensions, vec!["png", "jpg"]);
    assert_eq!(config.selection.order, ImageOrder::Numeric);
    assert!(!config.copy_images);

    assert!(Cli::try_parse_from(["voc2coco", "convert", "-d", "data", "--split", "train"]).is_err());
}

#[test]
fn test_model_option_parsing() {
    let option: ModelOption = "dn_scalar=100".parse().unwrap();
    assert_eq!(option.key, "dn_scalar");
    assert_eq!(option.value, "100");
    assert_eq!(option.to_string(), "dn_scalar=100");
    assert!("dn_scalar".parse::<ModelOption>().is_err());
    assert!("=1".parse::<ModelOption>().is_err());
    assert_eq!(default_model_options().len(), 6);
}

#[test]
fn test_evaluate_invocation_args() {
    let invocation = Invocation::Evaluate {
        config_path: PathBuf::from("config/DINO/DINO_4scale.py"),
        coco_path: PathBuf::from("/content/Dataset"),
        checkpoint: PathBuf::from("/content/checkpoint_dino.pth"),
        output_dir: PathBuf::from("logs/DINO/R50-MS4-B"),
        save_results: true,
        options: vec!["dn_scalar=100".parse().unwrap(), "use_ema=False".parse().unwrap()],
    };

    let expected: Vec<OsString> = [
        "--save_results",
        "--output_dir",
        "logs/DINO/R50-MS4-B",
        "-c",
        "config/DINO/DINO_4scale.py",
        "--coco_path",
        "/content/Dataset",
        "--eval",
        "--resume",
        "/content/checkpoint_dino.pth",
        "--options",
        "dn_scalar=100",
        "use_ema=False",
    ]
    .iter()
    .map(OsString::from)
    .collect();
    assert_eq!(invocation.to_args(), expected);
}

#[test]
fn test_finetune_invocation_args() {
    let invocation = Invocation::Finetune {
        config_path: PathBuf::from("config/DINO/DINO_4scale.py"),
        coco_path: PathBuf::from("/content/Dataset"),
        pretrained: PathBuf::from("/content/checkpoint_dino.pth"),
        output_dir: PathBuf::from("logs/DINO/fine_tune_R50-MS4"),
        finetune_ignore: vec!["label_enc.weight".to_string(), "class_embed".to_string()],
        options: Vec::new(),
    };

    let expected: Vec<OsString> = [
        "--finetune_ignore",
        "label_enc.weight",
        "class_embed",
        "--pretrain_model_path",
        "/content/checkpoint_dino.pth",
        "--output_dir",
        "logs/DINO/fine_tune_R50-MS4",
        "-c",
        "config/DINO/DINO_4scale.py",
        "--coco_path",
        "/content/Dataset",
    ]
    .iter()
    .map(OsString::from)
    .collect();
    assert_eq!(invocation.to_args(), expected);
}

#[test]
fn test_cli_eval_builds_runner() {
    let cli = Cli::try_parse_from([
        "voc2coco",
        "eval",
        "--repo_dir",
        "/content/DINO",
        "--coco_path",
        "/content/Dataset",
        "--resume",
        "/content/checkpoint_dino.pth",
        "--save_results",
    ])
    .unwrap();
    let args = match cli.command {
        Command::Eval(args) => args,
        other => panic!("unexpected command: {:?}", other),
    };

    let runner = args.model.to_runner();
    assert_eq!(runner.python, "python");
    assert_eq!(runner.repo_dir, PathBuf::from("/content/DINO"));
    assert_eq!(runner.entry_point, PathBuf::from("main.py"));

    match args.to_invocation() {
        Invocation::Evaluate {
            save_results,
            options,
            config_path,
            ..
        } => {
            assert!(save_results);
            assert_eq!(options, default_model_options());
            assert_eq!(config_path, PathBuf::from("config/DINO/DINO_4scale.py"));
        }
        other => panic!("unexpected invocation: {:?}", other),
    }
}

#[cfg(unix)]
#[test]
fn test_model_runner_exit_status() {
    let temp_dir = tempfile::tempdir().unwrap();
    let invocation = Invocation::Evaluate {
        config_path: PathBuf::from("config.py"),
        coco_path: PathBuf::from("data"),
        checkpoint: PathBuf::from("ckpt.pth"),
        output_dir: PathBuf::from("logs"),
        save_results: false,
        options: default_model_options(),
    };

    let ok = ModelRunner {
        python: "true".to_string(),
        repo_dir: temp_dir.path().to_path_buf(),
        entry_point: PathBuf::from("main.py"),
    };
    assert!(ok.run(&invocation).is_ok());

    let failing = ModelRunner {
        python: "false".to_string(),
        ..ok.clone()
    };
    match failing.run(&invocation) {
        Err(Error::ExternalCommand { program, code }) => {
            assert_eq!(program, "false");
            assert_eq!(code, Some(1));
        }
        other => panic!("unexpected result: {:?}", other),
    }

    let missing = ModelRunner {
        python: "definitely-not-a-python-binary".to_string(),
        ..ok
    };
    assert!(matches!(missing.run(&invocation), Err(Error::Io { .. })));
}
