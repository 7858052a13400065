mod common;
mod generator;
mod routing;
mod schedule;
