mod common;

use std::sync::Arc;

use post_risk::{
    data::posts::{read_documents, write_outcomes_to_path},
    pipeline::Pipeline,
};

use common::fixed_classifier;

#[tokio::test]
async fn classified_posts_round_trip_through_csv() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("reddit_posts.csv");
    std::fs::write(
        &input,
        "post_id,timestamp,content,preprocessed_content,likes,comments,shares\n\
         p1,2024-05-01 10:00:00,\"Just over\nmore text\",just over more text,4,1,0\n\
         p2,2024-05-01 11:00:00,Poison,poison,,,\n\
         p3,2024-05-01 12:00:00,Calm.,calm,2,0,0\n",
    )
    .unwrap();

    let documents = read_documents(&input).unwrap();
    assert_eq!(documents.len(), 3);
    assert_eq!(documents[0].text, "Just over\nmore text");

    let (classifier, _) = fixed_classifier();
    let report = Pipeline::new(Arc::new(classifier), 2).run(documents).await;

    let output = dir.path().join("out").join("data_with_sentiment.csv");
    write_outcomes_to_path(&output, &report.outcomes, true).unwrap();

    let mut reader = csv::Reader::from_path(&output).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        [
            "post_id",
            "timestamp",
            "content",
            "preprocessed_content",
            "likes",
            "comments",
            "shares",
            "sentiment",
            "risk_level",
            "status",
            "error",
            "high_similarity",
            "moderate_similarity",
            "matched_sentence",
        ]
    );

    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 3);

    assert_eq!(&rows[0][0], "p1");
    assert_eq!(&rows[0][2], "Just over\nmore text");
    assert_eq!(&rows[0][4], "4");
    assert_eq!(&rows[0][8], "High");
    assert_eq!(&rows[0][9], "ok");
    assert_eq!(&rows[0][11], "0.6000");
    assert_eq!(&rows[0][13], "Just over");

    assert_eq!(&rows[1][9], "failed");
    assert!(rows[1][10].contains("encoding error"));
    assert_eq!(&rows[1][8], "");

    assert_eq!(&rows[2][8], "Low");
    assert_eq!(&rows[2][7], "Positive");
    assert_eq!(&rows[0][7], "Neutral");
}
