use stackrun::compose::{ComposeFile, Operation, PortMapping, ProjectOptions};

const COMPOSE: &str = include_str!("fixtures/docker-compose.yml");

#[test]
fn test_fixture_contract() {
  let compose = ComposeFile::try_from(COMPOSE).unwrap();

  let names: Vec<&str> = compose.services.keys().collect();
  assert_eq!(names, vec!["app", "db"]);

  let app = compose.service("app").unwrap();
  assert_eq!(app.depends_on, vec!["db".to_string()]);
  assert!(compose.service("db").is_ok());
  assert_eq!(app.ports, vec![PortMapping::new(8000, 8000)]);

  let chain = app.command.as_ref().unwrap().chain().unwrap();
  assert_eq!(chain.len(), 3);
  assert_eq!(
    chain.links()[1],
    vec!["python", "manage.py", "migrate"]
      .into_iter()
      .map(String::from)
      .collect::<Vec<_>>()
  );
}

#[test]
fn test_round_trip_is_stable() {
  let compose = ComposeFile::try_from(COMPOSE).unwrap();
  let yaml = compose.to_yaml().unwrap();
  let reparsed = ComposeFile::try_from(yaml.as_str()).unwrap();

  assert_eq!(reparsed, compose);
  assert_eq!(reparsed.to_yaml().unwrap(), yaml);
}

#[test]
fn test_database_starts_before_app() {
  let compose = ComposeFile::try_from(COMPOSE).unwrap();
  let project = ProjectOptions::new("/srv/recipe-app");

  let started: Vec<String> = compose
    .plan_up(&project, &[])
    .unwrap()
    .into_iter()
    .filter_map(|operation| match operation {
      Operation::StartContainer(spec) => Some(spec.service),
      _ => None,
    })
    .collect();

  assert_eq!(started, vec!["db", "app"]);
}
