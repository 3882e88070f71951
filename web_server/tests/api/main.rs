mod health_check;
mod merge;
