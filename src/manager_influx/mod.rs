use std::time::Duration;
use log::{info, warn};
use ureq::Agent;
use crate::config;
use crate::errors::SinkError;
use crate::models::point::Point;
use crate::sink::PointSink;
use crate::tariff::Utility;

/// Writes points to an InfluxDB v2 bucket using line protocol
pub struct InfluxDb {
    agent: Agent,
    url: String,
    token: String,
    bucket: String,
    org: String,
    batch_size: usize,
}

impl InfluxDb {
    /// Returns a new InfluxDb writer
    ///
    /// # Arguments
    ///
    /// * 'config' - InfluxDB section of the configuration
    /// * 'timeout' - global timeout for each write request
    pub fn new(config: &config::InfluxDb, timeout: Duration) -> Self {
        let agent_config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();

        let agent = agent_config.into();

        Self {
            agent,
            url: format!("{}/api/v2/write", config.url.trim_end_matches('/')),
            token: config.token.clone(),
            bucket: config.bucket.clone(),
            org: config.org.clone(),
            batch_size: config.batch_size,
        }
    }
}

impl PointSink for InfluxDb {
    fn write(&self, utility: Utility, points: &[Point]) -> Result<(), SinkError> {
        let bodies = points
            .chunks(self.batch_size)
            .map(|batch| batch
                .iter()
                .filter_map(to_line_protocol)
                .collect::<Vec<String>>()
                .join("\n"))
            .filter(|body| !body.is_empty())
            .collect::<Vec<String>>();

        for body in bodies {
            self.agent
                .post(self.url.as_str())
                .query("org", &self.org)
                .query("bucket", &self.bucket)
                .query("precision", "s")
                .header("Authorization", format!("Token {}", self.token))
                .content_type("text/plain; charset=utf-8")
                .send(body)?;
        }

        info!("wrote {} {} points to bucket {}", points.len(), utility, self.bucket);
        Ok(())
    }
}

/// Encodes a point as one line of InfluxDB line protocol with second precision.
/// Non finite field values can't be represented and are left out, a point left without
/// any field is skipped altogether.
///
/// # Arguments
///
/// * 'point' - the point to encode
pub fn to_line_protocol(point: &Point) -> Option<String> {
    let fields = point.fields
        .iter()
        .filter(|&(key, value)| {
            if !value.is_finite() {
                warn!("dropping non finite field {} at {}", key, point.time);
            }
            value.is_finite()
        })
        .map(|(key, value)| format!("{}={}", escape(key, &[',', '=', ' ']), value))
        .collect::<Vec<String>>();

    if fields.is_empty() {
        warn!("skipping {} point at {} without fields", point.measurement, point.time);
        return None;
    }

    let mut line = escape(&point.measurement.to_string(), &[',', ' ']);

    for (key, value) in &point.tags {
        line.push(',');
        line.push_str(&escape(key, &[',', '=', ' ']));
        line.push('=');
        line.push_str(&escape(value, &[',', '=', ' ']));
    }

    line.push(' ');
    line.push_str(&fields.join(","));
    line.push(' ');
    line.push_str(&point.time.timestamp().to_string());

    Some(line)
}

fn escape(s: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use chrono::{DateTime, TimeDelta, Utc};
    use url::Url;
    use crate::models::point::{Fields, Tags};

    /// A request as received by the local server, lower case header names
    struct Received {
        target: String,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl Received {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
        }

        fn query_value(&self, key: &str) -> Option<String> {
            Url::parse(&format!("http://localhost{}", self.target)).unwrap()
                .query_pairs()
                .find(|(k, _)| k.as_ref() == key)
                .map(|(_, v)| v.into_owned())
        }
    }

    /// Answers one request per given status, one connection each, and returns what was received
    fn serve(statuses: Vec<u16>) -> (String, thread::JoinHandle<Vec<Received>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let mut received = Vec::new();
            for status in statuses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut raw = Vec::new();
                let mut buf = [0u8; 4096];
                let head_end = loop {
                    if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                        break pos;
                    }
                    let n = stream.read(&mut buf).unwrap();
                    assert!(n > 0, "connection closed before end of headers");
                    raw.extend_from_slice(&buf[..n]);
                };

                let head = String::from_utf8(raw[..head_end].to_vec()).unwrap();
                let mut lines = head.lines();
                let target = lines.next().unwrap().split(' ').nth(1).unwrap().to_string();
                let headers = lines
                    .filter_map(|line| line.split_once(':'))
                    .map(|(n, v)| (n.trim().to_lowercase(), v.trim().to_string()))
                    .collect::<Vec<(String, String)>>();
                let length = headers.iter()
                    .find(|(n, _)| n == "content-length")
                    .map(|(_, v)| v.parse::<usize>().unwrap())
                    .unwrap_or(0);

                let chunked = headers.iter().any(|(n, v)| n == "transfer-encoding" && v.contains("chunked"));
                let mut body = raw[head_end + 4..].to_vec();
                while (chunked && !body.ends_with(b"0\r\n\r\n")) || (!chunked && body.len() < length) {
                    let n = stream.read(&mut buf).unwrap();
                    assert!(n > 0, "connection closed before end of body");
                    body.extend_from_slice(&buf[..n]);
                }
                if chunked {
                    body = dechunk(&body);
                }

                let response = format!("HTTP/1.1 {} Status\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", status);
                stream.write_all(response.as_bytes()).unwrap();

                received.push(Received { target, headers, body: String::from_utf8(body).unwrap() });
            }
            received
        });

        (format!("http://{}/", addr), handle)
    }

    fn dechunk(raw: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        let mut rest = raw;
        loop {
            let line_end = rest.windows(2).position(|w| w == b"\r\n").unwrap();
            let size = usize::from_str_radix(std::str::from_utf8(&rest[..line_end]).unwrap().trim(), 16).unwrap();
            if size == 0 {
                return body;
            }
            body.extend_from_slice(&rest[line_end + 2..line_end + 2 + size]);
            rest = &rest[line_end + 4 + size..];
        }
    }

    fn influx(url: String, batch_size: usize) -> InfluxDb {
        let config = config::InfluxDb {
            url,
            token: "secret".to_string(),
            bucket: "energy".to_string(),
            org: "home".to_string(),
            batch_size,
        };
        InfluxDb::new(&config, Duration::from_secs(5))
    }

    fn points(count: i64) -> Vec<Point> {
        let start: DateTime<Utc> = "2024-01-15T00:30:00Z".parse().unwrap();
        (0..count)
            .map(|i| Point {
                measurement: Utility::Gas,
                tags: Tags::new(),
                time: start + TimeDelta::minutes(30 * i),
                fields: Fields::from([("consumption".to_string(), 1.0)]),
            })
            .collect()
    }

    #[test]
    fn writes_points_in_batches() {
        let (url, server) = serve(vec![204, 204]);

        influx(url, 2).write(Utility::Gas, &points(3)).unwrap();

        let received = server.join().unwrap();
        assert_eq!(received.len(), 2);
        for r in &received {
            assert!(r.target.starts_with("/api/v2/write?"));
            assert_eq!(r.query_value("org").as_deref(), Some("home"));
            assert_eq!(r.query_value("bucket").as_deref(), Some("energy"));
            assert_eq!(r.query_value("precision").as_deref(), Some("s"));
            assert_eq!(r.header("authorization"), Some("Token secret"));
        }
        assert_eq!(received[0].body, "gas consumption=1 1705278600\ngas consumption=1 1705280400");
        assert_eq!(received[1].body, "gas consumption=1 1705282200");
    }

    #[test]
    fn rejected_batch_is_an_error() {
        let (url, server) = serve(vec![400]);

        let result = influx(url, 2).write(Utility::Gas, &points(3));

        assert!(matches!(result, Err(SinkError::InfluxDb(_))));
        assert_eq!(server.join().unwrap().len(), 1);
    }

    fn point(tags: &[(&str, &str)], fields: &[(&str, f64)]) -> Point {
        let time: DateTime<Utc> = "2024-01-15T02:30:00Z".parse().unwrap();
        Point {
            measurement: Utility::Electricity,
            tags: tags.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect::<Tags>(),
            time,
            fields: fields.iter().map(|&(k, v)| (k.to_string(), v)).collect::<Fields>(),
        }
    }

    #[test]
    fn encodes_sorted_tags_and_fields() {
        let p = point(
            &[("time_of_day", "02:30"), ("active_rate", "low")],
            &[("total_cost", 3.5), ("consumption", 0.25), ("cost", 2.25)],
        );

        assert_eq!(to_line_protocol(&p).unwrap(),
                   "electricity,active_rate=low,time_of_day=02:30 consumption=0.25,cost=2.25,total_cost=3.5 1705285800");
    }

    #[test]
    fn escapes_special_characters() {
        let p = point(&[("my tag", "a,b=c")], &[("agile cost", 1.0)]);

        assert_eq!(to_line_protocol(&p).unwrap(), r"electricity,my\ tag=a\,b\=c agile\ cost=1 1705285800");
    }

    #[test]
    fn drops_non_finite_fields() {
        let p = point(&[], &[("cost", f64::NAN), ("consumption", 0.5)]);

        assert_eq!(to_line_protocol(&p).unwrap(), "electricity consumption=0.5 1705285800");
    }

    #[test]
    fn skips_point_without_finite_fields() {
        let p = point(&[("active_rate", "high")], &[("cost", f64::NAN), ("total_cost", f64::INFINITY)]);

        assert_eq!(to_line_protocol(&p), None);
    }
}
